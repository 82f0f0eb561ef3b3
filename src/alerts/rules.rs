use chrono::{DateTime, NaiveTime, Utc};

use crate::alerts::model::{Alert, Variant};
use crate::snapshot::{Deadline, Snapshot, Transaction};

/// Dedup key for the profitability alert. The condition is global, so a
/// breach that persists across re-evaluations maps to a single ledger entry.
pub const PROFIT_WARNING_KEY: &str = "profit-warning";

/// Net profit below this share of total income fires the alert (strict `<`).
const PROFIT_MARGIN_THRESHOLD: f64 = 0.20;

/// Deadlines due within this many days produce a proximity warning.
const DEADLINE_WINDOW_DAYS: i64 = 7;

/// Runs every rule against the snapshot. Rules are independent and each
/// output carries its own dedup key, so evaluation order never changes the
/// resulting ledger set.
pub fn evaluate(snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<Alert> {
    let mut alerts = Vec::new();
    if let Some(alert) = profitability_alert(&snapshot.transactions) {
        alerts.push(alert);
    }
    alerts.extend(deadline_alerts(&snapshot.deadlines, now));
    alerts
}

pub fn profitability_alert(transactions: &[Transaction]) -> Option<Alert> {
    let total_income: f64 = transactions
        .iter()
        .map(|t| t.amount)
        .filter(|amount| *amount > 0.0)
        .sum();
    let net_profit: f64 = transactions.iter().map(|t| t.amount).sum();

    if total_income <= 0.0 || net_profit / total_income >= PROFIT_MARGIN_THRESHOLD {
        return None;
    }

    Some(Alert {
        dedup_key: PROFIT_WARNING_KEY.to_owned(),
        message: "Profitability warning: net profit has fallen below 20% of total income."
            .to_owned(),
        variant: Variant::Error,
        persistent: true,
    })
}

pub fn deadline_alerts(deadlines: &[Deadline], now: DateTime<Utc>) -> Vec<Alert> {
    deadlines
        .iter()
        .filter_map(|deadline| {
            let days = days_remaining(deadline, now);
            if !(0..=DEADLINE_WINDOW_DAYS).contains(&days) {
                return None;
            }
            Some(Alert {
                dedup_key: format!("deadline-{}", deadline.id),
                message: format!("\"{}\" is due in {days} day(s).", deadline.title),
                variant: Variant::Warning,
                persistent: true,
            })
        })
        .collect()
}

/// Days until the deadline's midnight, rounded up. A deadline later today is
/// 0 days away; one that passed yesterday is negative.
pub fn days_remaining(deadline: &Deadline, now: DateTime<Utc>) -> i64 {
    let due = deadline.due_date.and_time(NaiveTime::MIN).and_utc();
    let seconds = (due - now).num_seconds();
    (seconds as f64 / 86_400.0).ceil() as i64
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, Utc};

    use super::{PROFIT_WARNING_KEY, deadline_alerts, evaluate, profitability_alert};
    use crate::alerts::model::Variant;
    use crate::snapshot::{Deadline, Snapshot, Transaction};

    fn tx(amount: f64) -> Transaction {
        Transaction {
            amount,
            category: "general".to_owned(),
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        }
    }

    fn deadline_in(id: &str, now: DateTime<Utc>, days: i64) -> Deadline {
        Deadline {
            id: id.to_owned(),
            title: format!("filing {id}"),
            category: "tax".to_owned(),
            due_date: (now + Duration::days(days)).date_naive(),
        }
    }

    fn noon() -> DateTime<Utc> {
        "2026-03-10T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn profitability_fires_strictly_below_twenty_percent() {
        // income 1000, net profit 199 => 19.9%
        let alert = profitability_alert(&[tx(1000.0), tx(-801.0)]).unwrap();
        assert_eq!(alert.dedup_key, PROFIT_WARNING_KEY);
        assert_eq!(alert.variant, Variant::Error);
        assert!(alert.persistent);
    }

    #[test]
    fn profitability_does_not_fire_at_exactly_twenty_percent() {
        // income 1000, net profit 200 => 20.0%
        assert!(profitability_alert(&[tx(1000.0), tx(-800.0)]).is_none());
    }

    #[test]
    fn profitability_needs_positive_income() {
        assert!(profitability_alert(&[]).is_none());
        assert!(profitability_alert(&[tx(-500.0)]).is_none());
    }

    #[test]
    fn deadline_window_boundaries() {
        let now = noon();

        let within = deadline_alerts(&[deadline_in("d1", now, 7)], now);
        assert_eq!(within.len(), 1);
        assert_eq!(within[0].dedup_key, "deadline-d1");
        assert_eq!(within[0].variant, Variant::Warning);

        assert!(deadline_alerts(&[deadline_in("d2", now, 8)], now).is_empty());
        assert!(deadline_alerts(&[deadline_in("d3", now, -1)], now).is_empty());
    }

    #[test]
    fn each_near_deadline_gets_its_own_key() {
        let now = noon();
        let alerts = deadline_alerts(
            &[deadline_in("a", now, 1), deadline_in("b", now, 3)],
            now,
        );
        let keys: Vec<_> = alerts.iter().map(|a| a.dedup_key.as_str()).collect();
        assert_eq!(keys, ["deadline-a", "deadline-b"]);
    }

    #[test]
    fn evaluate_combines_rule_outputs() {
        let now = noon();
        let snapshot = Snapshot {
            transactions: vec![tx(1000.0), tx(-900.0)],
            deadlines: vec![deadline_in("vat", now, 2)],
        };

        let alerts = evaluate(&snapshot, now);
        let keys: Vec<_> = alerts.iter().map(|a| a.dedup_key.as_str()).collect();
        assert_eq!(keys, [PROFIT_WARNING_KEY, "deadline-vat"]);
    }
}
