//! Auto-snapshot scheduler — unattended periodic report runs.
//!
//! One long-lived tokio task: after an initial delay it repeatedly drives a
//! full poll loop to completion under a fixed synthetic scope and persists
//! the result as a snapshot. Every sleep is select-ed against cancellation,
//! so shutdown is bounded in time. Overlapping firings cannot happen: the
//! scope is fixed, so a new firing attaches to a still-running computation
//! instead of duplicating it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use vantage_core::config::SchedulerSettings;
use vantage_core::report::{LoadingDirective, ReportStatus, Scope};
use vantage_core::ReportError;

use crate::queue::SummaryQueue;
use crate::snapshot_store::{save_snapshot, SnapshotStore};

/// Cancellation signalling shared between the handle and the running task.
#[derive(Clone)]
struct CancelFlag {
    tx: broadcast::Sender<()>,
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless cancelled first. Returns false on cancel.
    async fn sleep(&self, duration: Duration) -> bool {
        // Subscribe before checking the flag so a concurrent cancel() can
        // never slip between the check and the select.
        let mut rx = self.tx.subscribe();
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = rx.recv() => false,
        }
    }
}

/// Handle to the one scheduled auto-snapshot task.
///
/// Retained by process startup code and used exactly once at shutdown;
/// `cancel` is idempotent and safe after the task has already finished.
pub struct SchedulerHandle {
    flag: CancelFlag,
    task: tokio::task::JoinHandle<()>,
}

impl SchedulerHandle {
    /// Request cancellation, interrupting any in-progress sleep.
    pub fn cancel(&self) {
        if !self.flag.cancelled.swap(true, Ordering::SeqCst) {
            tracing::info!("auto-snapshot scheduler cancelled");
            let _ = self.flag.tx.send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.is_cancelled()
    }

    /// Wait for the task to wind down. Bounded: all sleeps are cancellable.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// The recurring auto-snapshot activity.
pub struct AutoSnapshot {
    queue: SummaryQueue,
    store: Arc<dyn SnapshotStore>,
    settings: SchedulerSettings,
}

impl AutoSnapshot {
    pub fn new(
        queue: SummaryQueue,
        store: Arc<dyn SnapshotStore>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            queue,
            store,
            settings,
        }
    }

    /// Spawn the recurring task and return its cancellation handle.
    pub fn spawn(self) -> SchedulerHandle {
        let flag = CancelFlag::new();
        let task_flag = flag.clone();
        let task = tokio::spawn(async move { self.run(task_flag).await });
        SchedulerHandle { flag, task }
    }

    async fn run(self, flag: CancelFlag) {
        let initial = Duration::from_secs(self.settings.initial_delay_minutes * 60);
        let period = Duration::from_secs(self.settings.period_minutes * 60);
        tracing::info!(
            initial_delay_minutes = self.settings.initial_delay_minutes,
            period_minutes = self.settings.period_minutes,
            "auto-snapshot scheduler started"
        );

        if !flag.sleep(initial).await {
            return;
        }
        loop {
            let started = tokio::time::Instant::now();
            if let Err(e) = self.run_one_firing(&flag).await {
                // An error in one firing must never stop future firings.
                tracing::warn!(error = %e, "auto-snapshot firing failed");
            }
            // Fixed rate: each firing starts one period after the previous
            // firing started, no matter how long that firing's poll loop
            // ran. A firing that overruns the period triggers the next one
            // immediately.
            let wait = (started + period).saturating_duration_since(tokio::time::Instant::now());
            if !flag.sleep(wait).await {
                return;
            }
        }
    }

    /// One scheduled firing: poll to completion, persist on success.
    async fn run_one_firing(&self, flag: &CancelFlag) -> Result<(), ReportError> {
        let scope = Scope::system(self.settings.neutral_org.clone());
        let backoff = Duration::from_secs(self.settings.poll_backoff_secs);
        let mut directive = LoadingDirective::Start;
        let mut polls = 0u32;

        tracing::info!(org = %scope.org, "auto-snapshot firing started");

        let mut response = loop {
            if flag.is_cancelled() {
                tracing::info!(polls, "auto-snapshot firing cancelled");
                return Ok(());
            }
            let r = self.queue.poll(&scope, directive)?;
            directive = LoadingDirective::NoStart;
            polls += 1;
            tracing::debug!(polls, percent = r.percent, status = ?r.status, "auto-snapshot poll");

            if r.status.is_terminal() {
                break r;
            }
            if !flag.sleep(backoff).await {
                tracing::info!(polls, "auto-snapshot firing cancelled");
                return Ok(());
            }
        };

        if response.status == ReportStatus::Ready {
            let id = save_snapshot(self.store.as_ref(), &mut response)?;
            tracing::info!(snapshot_id = %id, "auto-snapshot saved");
        }
        tracing::info!(status = ?response.status, polls, "auto-snapshot firing finished");
        Ok(())
    }
}
