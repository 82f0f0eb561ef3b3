use std::sync::{Arc, Mutex, MutexGuard};

use crate::alerts::model::Notification;
use crate::store::KeyValueStore;

pub const LEDGER_STORE_KEY: &str = "notifications";

/// Durable notification list with write-through persistence. One instance per
/// process owns the store key; every mutation persists the full list
/// synchronously before returning. Store failures are logged and the
/// in-memory list stays authoritative for the rest of the session.
pub struct NotificationLedger {
    store: Arc<dyn KeyValueStore>,
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLedger {
    /// Loads persisted notifications. An absent or malformed payload starts
    /// the ledger empty; construction never fails.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let entries = match store.get(LEDGER_STORE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Notification>>(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(%err, "persisted notifications are malformed, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(?err, "read persisted notifications failed, starting empty");
                Vec::new()
            }
        };

        Self {
            store,
            entries: Mutex::new(entries),
        }
    }

    /// Appends unless an entry with the same id already exists; the existing
    /// entry is left untouched in that case. Returns whether an entry was
    /// appended.
    pub fn add(&self, notification: Notification) -> bool {
        let mut entries = self.lock_entries();
        if entries.iter().any(|n| n.id == notification.id) {
            return false;
        }
        entries.push(notification);
        self.persist(&entries);
        true
    }

    /// Acknowledges a notification. No-op when the id is absent. `read` never
    /// reverts to false for a given id.
    pub fn mark_read(&self, id: &str) {
        let mut entries = self.lock_entries();
        let Some(entry) = entries.iter_mut().find(|n| n.id == id) else {
            return;
        };
        entry.read = true;
        self.persist(&entries);
    }

    /// Full list in stable append order. Newest-first is the caller's
    /// display concern.
    pub fn list(&self) -> Vec<Notification> {
        self.lock_entries().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.lock_entries().iter().filter(|n| !n.read).count()
    }

    fn lock_entries(&self) -> MutexGuard<'_, Vec<Notification>> {
        // No writer panics while holding the lock; recover a poisoned guard
        // instead of propagating.
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persist(&self, entries: &[Notification]) {
        let raw = match serde_json::to_string(entries) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(%err, "serialize notifications failed");
                return;
            }
        };
        if let Err(err) = self.store.set(LEDGER_STORE_KEY, &raw) {
            tracing::warn!(?err, "persist notifications failed, keeping in-memory state");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::{LEDGER_STORE_KEY, NotificationLedger};
    use crate::alerts::model::{Notification, Variant};
    use crate::store::{KeyValueStore, MemoryKeyValueStore};

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("store unavailable")
        }

        fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("quota exceeded")
        }
    }

    fn ledger() -> NotificationLedger {
        NotificationLedger::load(Arc::new(MemoryKeyValueStore::new()))
    }

    fn note(id: &str, message: &str) -> Notification {
        Notification::new(id, message, Variant::Info, Utc::now())
    }

    #[test]
    fn add_dedups_by_id_and_keeps_original_fields() {
        let ledger = ledger();

        assert!(ledger.add(note("profit-warning", "original")));
        assert!(!ledger.add(note("profit-warning", "replacement")));

        let entries = ledger.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "original");
    }

    #[test]
    fn list_preserves_append_order() {
        let ledger = ledger();
        ledger.add(note("a", "first"));
        ledger.add(note("b", "second"));
        ledger.add(note("c", "third"));

        let ids: Vec<_> = ledger.list().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn mark_read_is_monotonic() {
        let ledger = ledger();
        ledger.add(note("a", "x"));

        ledger.mark_read("a");
        ledger.mark_read("a");
        ledger.mark_read("missing");

        let entries = ledger.list();
        assert!(entries[0].read);
    }

    #[test]
    fn unread_count_tracks_mutations() {
        let ledger = ledger();
        assert_eq!(ledger.unread_count(), 0);

        ledger.add(note("a", "x"));
        ledger.add(note("b", "y"));
        assert_eq!(ledger.unread_count(), 2);

        ledger.mark_read("a");
        assert_eq!(ledger.unread_count(), 1);

        ledger.mark_read("a");
        ledger.add(note("a", "duplicate"));
        assert_eq!(ledger.unread_count(), 1);
    }

    #[test]
    fn malformed_payload_starts_empty() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.set(LEDGER_STORE_KEY, "not json at all").unwrap();

        let ledger = NotificationLedger::load(store);
        assert!(ledger.list().is_empty());
    }

    #[test]
    fn store_failure_keeps_ledger_usable_in_memory() {
        let ledger = NotificationLedger::load(Arc::new(FailingStore));

        assert!(ledger.add(note("a", "x")));
        ledger.mark_read("a");

        assert_eq!(ledger.list().len(), 1);
        assert!(ledger.list()[0].read);
        assert_eq!(ledger.unread_count(), 0);
    }
}
