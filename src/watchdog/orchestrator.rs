use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::alerts::model::Variant;
use crate::alerts::toast::ToastChannel;
use crate::watchdog::api::CrawlerApi;
use crate::watchdog::model::{CrawlerJobStatus, JobState, TriggerResponse};

/// Reconciles optimistic local job state with server truth. `trigger` flips a
/// job to `running` before the start request goes out; every completed poll
/// overwrites the whole map with what the server reports, so an optimistic
/// value never outlives one poll round. Single writer: only this struct
/// touches the map, and map writes are idempotent against a stale trigger
/// completing after teardown.
pub struct CrawlerStatusOrchestrator {
    api: Arc<dyn CrawlerApi>,
    toasts: Arc<dyn ToastChannel>,
    poll_interval: Duration,
    statuses: Mutex<HashMap<String, CrawlerJobStatus>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl CrawlerStatusOrchestrator {
    pub fn new(
        api: Arc<dyn CrawlerApi>,
        toasts: Arc<dyn ToastChannel>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            api,
            toasts,
            poll_interval,
            statuses: Mutex::new(HashMap::new()),
            poll_task: Mutex::new(None),
        }
    }

    pub fn current_state(&self, job_name: &str) -> Option<CrawlerJobStatus> {
        self.lock_statuses().get(job_name).cloned()
    }

    /// All known job statuses, ordered by job name.
    pub fn statuses(&self) -> Vec<CrawlerJobStatus> {
        let mut all: Vec<_> = self.lock_statuses().values().cloned().collect();
        all.sort_by(|a, b| a.job_name.cmp(&b.job_name));
        all
    }

    /// Starts a job on the remote service. Local state flips to `running`
    /// before the request goes out; a failed request restores the exact prior
    /// entry and surfaces one error toast instead of waiting for the next
    /// poll to catch up.
    pub async fn trigger(&self, job_name: &str) -> anyhow::Result<TriggerResponse> {
        let prior = {
            let mut statuses = self.lock_statuses();
            let prior = statuses.get(job_name).cloned();
            let mut optimistic = prior
                .clone()
                .unwrap_or_else(|| CrawlerJobStatus::idle(job_name));
            optimistic.state = JobState::Running;
            statuses.insert(job_name.to_owned(), optimistic);
            prior
        };

        match self.api.trigger_job(job_name).await {
            Ok(response) => {
                self.push_toast(&response.message, Variant::Info);
                Ok(response)
            }
            Err(err) => {
                {
                    let mut statuses = self.lock_statuses();
                    match prior {
                        Some(prior) => {
                            statuses.insert(job_name.to_owned(), prior);
                        }
                        None => {
                            statuses.remove(job_name);
                        }
                    }
                }
                self.push_toast(&format!("Failed to start {job_name}."), Variant::Error);
                Err(err.context(format!("trigger job: {job_name}")))
            }
        }
    }

    /// One poll round. Server truth replaces the whole map; a failed fetch
    /// keeps the previous map so state never regresses to unknown, and the
    /// next attempt proceeds on schedule.
    pub async fn poll_once(&self) {
        match self.api.fetch_job_statuses().await {
            Ok(reported) => {
                let map = reported
                    .into_iter()
                    .map(|status| (status.job_name.clone(), status))
                    .collect();
                *self.lock_statuses() = map;
            }
            Err(err) => {
                tracing::warn!(?err, "crawler status poll failed, keeping last known state");
            }
        }
    }

    /// Spawns the poll loop, first round immediately. No-op while a loop is
    /// already running. The loop holds only a weak handle, so dropping the
    /// orchestrator also winds it down.
    pub fn start(self: &Arc<Self>) {
        let mut poll_task = self.lock_poll_task();
        if poll_task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }

        let weak = Arc::downgrade(self);
        let poll_interval = self.poll_interval;
        *poll_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(orchestrator) = weak.upgrade() else {
                    break;
                };
                orchestrator.poll_once().await;
            }
        }));
    }

    /// Cancels the poll loop. Safe to call when it is not running.
    pub fn stop(&self) {
        if let Some(task) = self.lock_poll_task().take() {
            task.abort();
        }
    }

    fn push_toast(&self, message: &str, variant: Variant) {
        if let Err(err) = self.toasts.push(message, variant) {
            tracing::warn!(?err, message, "toast push failed");
        }
    }

    fn lock_statuses(&self) -> MutexGuard<'_, HashMap<String, CrawlerJobStatus>> {
        match self.statuses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_poll_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.poll_task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for CrawlerStatusOrchestrator {
    fn drop(&mut self) {
        let task = match self.poll_task.get_mut() {
            Ok(task) => task.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = task {
            task.abort();
        }
    }
}
