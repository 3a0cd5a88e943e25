//! Vantage integration test harness.
//!
//! Scenarios run fully in-process across the service crates: a scripted
//! or threaded oracle behind the queue, the real handler and stores on
//! top. Scheduler tests use tokio's paused clock, so no test here depends
//! on wall-clock timing.

use std::collections::VecDeque;
use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Mutex};

use vantage_core::config::AuthConfig;
use vantage_core::report::{LoadingDirective, ReportStatus, Scope};
use vantage_services::{
    OracleReport, ProgressOracle, ReportHandler, SnapshotMap, StaticAuthorizer, SummaryQueue,
};

mod report_flow;
mod scheduler;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Oracle that replays a fixed sequence of reports, repeating the final
/// entry once the script runs out. Counts every advance.
pub struct ScriptedOracle {
    script: Mutex<VecDeque<OracleReport>>,
    pub advances: AtomicU32,
}

impl ScriptedOracle {
    pub fn new(script: &[(ReportStatus, u8, &str)]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(
                script
                    .iter()
                    .map(|(status, percent, payload)| OracleReport {
                        status: *status,
                        percent: *percent,
                        payload: payload.to_string(),
                    })
                    .collect(),
            ),
            advances: AtomicU32::new(0),
        })
    }
}

impl ProgressOracle for ScriptedOracle {
    fn advance(
        &self,
        _scope: &Scope,
        directive: LoadingDirective,
    ) -> anyhow::Result<OracleReport> {
        self.advances
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if directive == LoadingDirective::ForceStop {
            return Ok(OracleReport {
                status: ReportStatus::Stopped,
                percent: 0,
                payload: String::new(),
            });
        }
        let mut script = self.script.lock().unwrap();
        Ok(if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().expect("script must not be empty").clone()
        })
    }
}

/// Handler over a scripted oracle and an in-memory store.
///
/// `creators` are the only sessions allowed to create snapshots; everyone
/// with a session may request reports.
pub fn make_handler(
    oracle: Arc<ScriptedOracle>,
    creators: &[&str],
) -> (ReportHandler, SummaryQueue, SnapshotMap) {
    let queue = SummaryQueue::new(oracle);
    let store = SnapshotMap::new();
    let auth = StaticAuthorizer::from_config(&AuthConfig {
        allow_all_reports: true,
        reporters: vec![],
        snapshot_creators: creators.iter().map(|s| s.to_string()).collect(),
    });
    let handler = ReportHandler::new(queue.clone(), Arc::new(store.clone()), Arc::new(auth));
    (handler, queue, store)
}
