//! Progress oracle — the long-running computation behind the queue.
//!
//! The queue never runs report generation itself; it delegates to a
//! `ProgressOracle` and relays the current `{status, percent, payload}`.
//! `ThreadedOracle` is the shipped implementation: one worker thread per
//! scope running a `ReportBuilder`, with a shared percent gauge and a
//! cooperative cancel flag.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use vantage_core::report::{LoadingDirective, ReportStatus, Scope};

/// One poll's worth of oracle output.
#[derive(Debug, Clone)]
pub struct OracleReport {
    pub status: ReportStatus,
    /// Completion estimate, 0–100.
    pub percent: u8,
    /// Report payload. Empty until `status` is `Ready`.
    pub payload: String,
}

impl OracleReport {
    fn pending(percent: u8) -> Self {
        Self {
            status: if percent == 0 {
                ReportStatus::Waiting
            } else {
                ReportStatus::Processing
            },
            percent,
            payload: String::new(),
        }
    }
}

/// Advances or queries one long-running computation per scope.
///
/// `Err` means an infrastructure fault and propagates to the caller.
/// A failed computation is reported in-band as `ReportStatus::Failed`.
pub trait ProgressOracle: Send + Sync {
    fn advance(&self, scope: &Scope, directive: LoadingDirective) -> anyhow::Result<OracleReport>;
}

// ── Threaded implementation ───────────────────────────────────────────────────

/// Progress state shared between a worker thread and the oracle.
#[derive(Debug, Default)]
pub struct BuildProgress {
    percent: AtomicU8,
    cancelled: AtomicBool,
}

impl BuildProgress {
    pub fn set_percent(&self, percent: u8) {
        self.percent.store(percent.min(100), Ordering::Relaxed);
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Relaxed)
    }

    /// Builders should poll this and bail out promptly when set.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

/// Produces the actual report payload. Runs on a worker thread; expected to
/// take a while, update `progress` as it goes, and honor cancellation.
pub trait ReportBuilder: Send + Sync + 'static {
    fn build(&self, scope: &Scope, progress: &BuildProgress) -> anyhow::Result<String>;
}

struct Job {
    progress: Arc<BuildProgress>,
    /// Filled exactly once by the worker thread when the build finishes.
    outcome: Arc<Mutex<Option<Result<String, String>>>>,
}

/// Oracle that runs one `ReportBuilder` invocation per scope on a
/// dedicated worker thread.
pub struct ThreadedOracle {
    builder: Arc<dyn ReportBuilder>,
    jobs: DashMap<Scope, Job>,
}

impl ThreadedOracle {
    pub fn new(builder: Arc<dyn ReportBuilder>) -> Self {
        Self {
            builder,
            jobs: DashMap::new(),
        }
    }

    fn spawn_job(&self, scope: &Scope) -> Job {
        tracing::debug!(org = %scope.org, "report build started");
        let progress = Arc::new(BuildProgress::default());
        let outcome = Arc::new(Mutex::new(None));
        let builder = self.builder.clone();
        let scope = scope.clone();
        {
            let progress = progress.clone();
            let outcome = outcome.clone();
            std::thread::spawn(move || {
                let result = builder
                    .build(&scope, &progress)
                    .map_err(|e| e.to_string());
                if let Ok(mut slot) = outcome.lock() {
                    *slot = Some(result);
                }
            });
        }
        Job { progress, outcome }
    }

    fn report_for(&self, scope: &Scope) -> anyhow::Result<OracleReport> {
        let Some(job) = self.jobs.get(scope) else {
            return Ok(OracleReport::pending(0));
        };

        let outcome = job
            .outcome
            .lock()
            .map_err(|_| anyhow::anyhow!("report build outcome mutex poisoned"))?
            .clone();

        let report = match outcome {
            None => OracleReport::pending(job.progress.percent()),
            Some(Ok(payload)) => OracleReport {
                status: ReportStatus::Ready,
                percent: 100,
                payload,
            },
            Some(Err(err)) => {
                tracing::warn!(org = %scope.org, error = %err, "report build failed");
                OracleReport {
                    status: ReportStatus::Failed,
                    percent: job.progress.percent(),
                    payload: String::new(),
                }
            }
        };
        drop(job);

        if report.status.is_terminal() {
            self.jobs.remove(scope);
        }
        Ok(report)
    }
}

impl ProgressOracle for ThreadedOracle {
    fn advance(&self, scope: &Scope, directive: LoadingDirective) -> anyhow::Result<OracleReport> {
        match directive {
            LoadingDirective::Start => {
                // entry() makes the exists-check and insert atomic, so two
                // concurrent starts spawn exactly one worker.
                self.jobs
                    .entry(scope.clone())
                    .or_insert_with(|| self.spawn_job(scope));
                self.report_for(scope)
            }
            LoadingDirective::NoStart => self.report_for(scope),
            LoadingDirective::ForceStop => {
                if let Some((_, job)) = self.jobs.remove(scope) {
                    job.progress.cancel();
                    tracing::debug!(org = %scope.org, "report build cancelled");
                }
                Ok(OracleReport {
                    status: ReportStatus::Stopped,
                    percent: 0,
                    payload: String::new(),
                })
            }
        }
    }
}
