//! Shared computation queue — coalesces callers onto one computation per scope.
//!
//! The queue owns the scope registry and enforces the poll protocol:
//! `Start` registers-or-attaches, `NoStart` attaches only, `ForceStop`
//! cancels and deregisters. At most one computation per scope is ever in
//! flight; registration is atomic via dashmap entry semantics.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

use vantage_core::report::{LoadingDirective, ReportResponse, Scope};
use vantage_core::ReportError;

use crate::oracle::ProgressOracle;

/// Registry record for one in-flight computation.
#[derive(Debug, Clone)]
struct InFlight {
    /// Unix ms when the scope was registered.
    registered_at: u64,
    /// Last percent observed from the oracle.
    last_percent: u8,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Poll protocol front-end over the progress oracle.
///
/// Callers hold only `Scope` values; the registry is internal. Entries are
/// removed when a computation reaches a terminal status or is force-stopped,
/// so a later `Start` begins fresh.
#[derive(Clone)]
pub struct SummaryQueue {
    oracle: Arc<dyn ProgressOracle>,
    registry: Arc<DashMap<Scope, InFlight>>,
}

impl SummaryQueue {
    pub fn new(oracle: Arc<dyn ProgressOracle>) -> Self {
        Self {
            oracle,
            registry: Arc::new(DashMap::new()),
        }
    }

    /// Drive one poll cycle for `scope`.
    ///
    /// Computation failures come back in-band as a terminal status;
    /// only infrastructure faults (oracle I/O, storage) return `Err`.
    pub fn poll(
        &self,
        scope: &Scope,
        directive: LoadingDirective,
    ) -> Result<ReportResponse, ReportError> {
        match directive {
            LoadingDirective::Start => {
                self.registry.entry(scope.clone()).or_insert_with(|| {
                    tracing::debug!(org = %scope.org, "scope registered");
                    InFlight {
                        registered_at: now_ms(),
                        last_percent: 0,
                    }
                });
                let response = self.advance(scope, LoadingDirective::Start)?;
                // A ForceStop can land between the registration above and
                // the oracle call; its cancel then precedes the job spawn,
                // leaving the oracle with a job the registry no longer
                // knows about. A pending report with no registration means
                // exactly that: cancel the orphan and report the stop.
                if response.status.is_pending() && !self.registry.contains_key(scope) {
                    self.oracle
                        .advance(scope, LoadingDirective::ForceStop)
                        .map_err(ReportError::Oracle)?;
                    tracing::debug!(org = %scope.org, "orphaned start cancelled");
                    return Ok(ReportResponse::stopped());
                }
                Ok(response)
            }
            LoadingDirective::NoStart => {
                if !self.registry.contains_key(scope) {
                    // Attach-only against nothing: a no-op, not an error.
                    return Ok(ReportResponse::waiting());
                }
                self.advance(scope, LoadingDirective::NoStart)
            }
            LoadingDirective::ForceStop => {
                if self.registry.remove(scope).is_some() {
                    self.oracle
                        .advance(scope, LoadingDirective::ForceStop)
                        .map_err(ReportError::Oracle)?;
                    tracing::info!(org = %scope.org, "scope force-stopped");
                }
                Ok(ReportResponse::stopped())
            }
        }
    }

    fn advance(
        &self,
        scope: &Scope,
        directive: LoadingDirective,
    ) -> Result<ReportResponse, ReportError> {
        let report = match self.oracle.advance(scope, directive) {
            Ok(r) => r,
            Err(e) => {
                // A broken oracle must not wedge the scope forever.
                self.registry.remove(scope);
                return Err(ReportError::Oracle(e));
            }
        };

        if report.status.is_terminal() {
            self.registry.remove(scope);
        } else if let Some(mut entry) = self.registry.get_mut(scope) {
            entry.last_percent = report.percent;
        }

        Ok(ReportResponse {
            status: report.status,
            percent: report.percent,
            payload: report.payload,
            snapshot_id: None,
        })
    }

    /// Number of registered scopes.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn is_registered(&self, scope: &Scope) -> bool {
        self.registry.contains_key(scope)
    }

    /// Snapshot of the registry for the status endpoint.
    pub fn in_flight(&self) -> Vec<InFlightInfo> {
        self.registry
            .iter()
            .map(|e| InFlightInfo {
                scope: e.key().clone(),
                percent: e.last_percent,
                age_secs: now_ms().saturating_sub(e.registered_at) / 1000,
            })
            .collect()
    }
}

/// Read-only view of one registry entry.
#[derive(Debug, Clone)]
pub struct InFlightInfo {
    pub scope: Scope,
    pub percent: u8,
    pub age_secs: u64,
}
