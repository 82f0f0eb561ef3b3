use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Info,
    Success,
    Warning,
    Error,
}

/// A persisted, acknowledgeable notification. `id` doubles as the dedup key:
/// the ledger holds at most one entry per id. `read` only ever moves
/// false -> true.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub variant: Variant,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(
        id: impl Into<String>,
        message: impl Into<String>,
        variant: Variant,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            variant,
            created_at,
            read: false,
        }
    }
}

/// Output of a single rule evaluation. `persistent` is decided by the
/// producer: rule alerts go to the ledger, ad-hoc notices stay toast-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub dedup_key: String,
    pub message: String,
    pub variant: Variant,
    pub persistent: bool,
}
