use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::alerts::ledger::NotificationLedger;
use crate::alerts::model::{Alert, Notification, Variant};
use crate::alerts::rules;
use crate::alerts::toast::ToastChannel;
use crate::snapshot::Snapshot;

/// Runs the alert rules and fans each result out to the toast channel and,
/// for persistent alerts, the ledger. The two side effects are attempted
/// independently; failures are logged and never reach the caller, whose
/// primary action this work is auxiliary to.
pub struct AlertDispatcher {
    ledger: Arc<NotificationLedger>,
    toasts: Arc<dyn ToastChannel>,
}

impl AlertDispatcher {
    pub fn new(ledger: Arc<NotificationLedger>, toasts: Arc<dyn ToastChannel>) -> Self {
        Self { ledger, toasts }
    }

    /// Evaluates every rule against the snapshot and dispatches the results.
    /// Returns the produced alerts so callers can report what fired. Safe to
    /// re-run on an unchanged snapshot: the toast repeats, the ledger entry
    /// does not.
    pub fn evaluate_and_dispatch(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<Alert> {
        let alerts = rules::evaluate(snapshot, now);
        for alert in &alerts {
            self.dispatch(alert, now);
        }
        alerts
    }

    /// Ad-hoc notice from a user action ("transaction added"). Toast only,
    /// no ledger entry.
    pub fn notify_transient(&self, message: &str, variant: Variant) {
        if let Err(err) = self.toasts.push(message, variant) {
            tracing::warn!(?err, message, "toast push failed");
        }
    }

    fn dispatch(&self, alert: &Alert, now: DateTime<Utc>) {
        if let Err(err) = self.toasts.push(&alert.message, alert.variant) {
            tracing::warn!(?err, dedup_key = %alert.dedup_key, "toast push failed");
        }

        if !alert.persistent {
            return;
        }
        let notification =
            Notification::new(alert.dedup_key.clone(), alert.message.clone(), alert.variant, now);
        if self.ledger.add(notification) {
            tracing::info!(dedup_key = %alert.dedup_key, "persisted new alert");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, NaiveDate, Utc};

    use super::AlertDispatcher;
    use crate::alerts::ledger::NotificationLedger;
    use crate::alerts::model::Variant;
    use crate::alerts::rules::PROFIT_WARNING_KEY;
    use crate::alerts::toast::{MemoryToastChannel, ToastChannel};
    use crate::snapshot::{Deadline, Snapshot, Transaction};
    use crate::store::MemoryKeyValueStore;

    struct FailingToastChannel;

    impl ToastChannel for FailingToastChannel {
        fn push(&self, _message: &str, _variant: Variant) -> anyhow::Result<()> {
            anyhow::bail!("toast channel down")
        }
    }

    fn unprofitable_snapshot() -> Snapshot {
        Snapshot {
            transactions: vec![
                Transaction {
                    amount: 1000.0,
                    category: "sales".to_owned(),
                    date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
                },
                Transaction {
                    amount: -900.0,
                    category: "rent".to_owned(),
                    date: NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
                },
            ],
            deadlines: Vec::new(),
        }
    }

    #[test]
    fn re_evaluation_repeats_toast_but_not_ledger_entry() {
        let ledger = Arc::new(NotificationLedger::load(Arc::new(MemoryKeyValueStore::new())));
        let toasts = Arc::new(MemoryToastChannel::new());
        let dispatcher = AlertDispatcher::new(Arc::clone(&ledger), toasts.clone());

        let snapshot = unprofitable_snapshot();
        let now = Utc::now();
        dispatcher.evaluate_and_dispatch(&snapshot, now);
        dispatcher.evaluate_and_dispatch(&snapshot, now);

        assert_eq!(toasts.pushed().len(), 2);
        let entries = ledger.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, PROFIT_WARNING_KEY);
    }

    #[test]
    fn transient_notice_skips_the_ledger() {
        let ledger = Arc::new(NotificationLedger::load(Arc::new(MemoryKeyValueStore::new())));
        let toasts = Arc::new(MemoryToastChannel::new());
        let dispatcher = AlertDispatcher::new(Arc::clone(&ledger), toasts.clone());

        dispatcher.notify_transient("transaction added", Variant::Success);

        assert_eq!(
            toasts.pushed(),
            [("transaction added".to_owned(), Variant::Success)]
        );
        assert!(ledger.list().is_empty());
    }

    #[test]
    fn toast_failure_does_not_block_persistence() {
        let ledger = Arc::new(NotificationLedger::load(Arc::new(MemoryKeyValueStore::new())));
        let dispatcher = AlertDispatcher::new(Arc::clone(&ledger), Arc::new(FailingToastChannel));

        let alerts = dispatcher.evaluate_and_dispatch(&unprofitable_snapshot(), Utc::now());

        assert_eq!(alerts.len(), 1);
        assert_eq!(ledger.list().len(), 1);
    }

    #[test]
    fn deadline_alerts_persist_per_deadline() {
        let ledger = Arc::new(NotificationLedger::load(Arc::new(MemoryKeyValueStore::new())));
        let toasts = Arc::new(MemoryToastChannel::new());
        let dispatcher = AlertDispatcher::new(Arc::clone(&ledger), toasts.clone());

        let now = Utc::now();
        let snapshot = Snapshot {
            transactions: Vec::new(),
            deadlines: vec![
                Deadline {
                    id: "vat-q1".to_owned(),
                    title: "VAT filing".to_owned(),
                    category: "tax".to_owned(),
                    due_date: (now + Duration::days(2)).date_naive(),
                },
                Deadline {
                    id: "license".to_owned(),
                    title: "License renewal".to_owned(),
                    category: "legal".to_owned(),
                    due_date: (now + Duration::days(30)).date_naive(),
                },
            ],
        };

        dispatcher.evaluate_and_dispatch(&snapshot, now);
        dispatcher.evaluate_and_dispatch(&snapshot, now);

        let ids: Vec<_> = ledger.list().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, ["deadline-vat-q1"]);
    }
}
