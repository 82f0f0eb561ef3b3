use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    Success,
    Failed,
}

/// Last known status of one background crawler job. `items_added` is
/// meaningful on success, `details` on failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrawlerJobStatus {
    pub job_name: String,
    pub state: JobState,
    pub last_run_finished_at: Option<DateTime<Utc>>,
    pub items_added: Option<u64>,
    pub details: Option<String>,
}

impl CrawlerJobStatus {
    pub fn idle(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            state: JobState::Idle,
            last_run_finished_at: None,
            items_added: None,
            details: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub message: String,
}
