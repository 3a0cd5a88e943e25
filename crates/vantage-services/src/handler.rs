//! Report request handler — one poll cycle per invocation.
//!
//! The handler validates the caller, drives exactly one poll against the
//! queue per call (one HTTP round trip == one poll; the client re-invokes
//! to continue), and handles snapshot persistence and retrieval. It never
//! sleeps or retries — that belongs to callers and the scheduler.

use std::sync::Arc;

use serde::Deserialize;

use vantage_core::report::{
    LoadingDirective, OwnerId, ReportResponse, ReportStatus, Scope, SnapshotDirective,
};
use vantage_core::ReportError;

use crate::auth::{Authorizer, Caller};
use crate::queue::SummaryQueue;
use crate::snapshot_store::{save_snapshot, SnapshotStore};

/// One poll request, as received from a client.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    pub loading_directive: LoadingDirective,
    #[serde(default)]
    pub snapshot_directive: SnapshotDirective,
    /// Required for `SnapshotDirective::Show`, ignored otherwise.
    #[serde(default)]
    pub snapshot_id: Option<String>,
}

/// Outcome of one handler invocation.
#[derive(Debug, Clone)]
pub enum ReportReply {
    /// A freshly built response from this poll cycle.
    Live(ReportResponse),
    /// A stored snapshot body, returned verbatim.
    Stored(String),
}

#[derive(Clone)]
pub struct ReportHandler {
    queue: SummaryQueue,
    store: Arc<dyn SnapshotStore>,
    auth: Arc<dyn Authorizer>,
}

impl ReportHandler {
    pub fn new(
        queue: SummaryQueue,
        store: Arc<dyn SnapshotStore>,
        auth: Arc<dyn Authorizer>,
    ) -> Self {
        Self { queue, store, auth }
    }

    /// Validate, poll once, optionally persist or serve a snapshot.
    pub fn handle(
        &self,
        caller: &Caller,
        request: &ReportRequest,
    ) -> Result<ReportReply, ReportError> {
        if !self.auth.can_request_reports(caller) {
            return Err(ReportError::Forbidden);
        }
        if request.snapshot_directive == SnapshotDirective::Create
            && !self.auth.can_create_snapshots(caller)
        {
            return Err(ReportError::Forbidden);
        }

        if request.snapshot_directive == SnapshotDirective::Show {
            // Serving a snapshot never touches the queue.
            let id = request.snapshot_id.as_deref().unwrap_or_default();
            return match self.store.get(id)? {
                Some(body) => Ok(ReportReply::Stored(body)),
                None => Err(ReportError::SnapshotNotFound(id.to_string())),
            };
        }

        let scope = Scope::new(&caller.org, OwnerId::Session(caller.session.clone()));
        tracing::debug!(
            org = %caller.org,
            directive = ?request.loading_directive,
            "report poll"
        );
        let mut response = self.queue.poll(&scope, request.loading_directive)?;

        if response.status == ReportStatus::Ready
            && request.snapshot_directive == SnapshotDirective::Create
        {
            let id = save_snapshot(self.store.as_ref(), &mut response)?;
            tracing::info!(snapshot_id = %id, org = %caller.org, "snapshot created");
        }

        Ok(ReportReply::Live(response))
    }

    /// Ids of all stored snapshots. Requires report permission.
    pub fn list_snapshots(&self, caller: &Caller) -> Result<Vec<String>, ReportError> {
        if !self.auth.can_request_reports(caller) {
            return Err(ReportError::Forbidden);
        }
        self.store.list()
    }

    pub fn queue(&self) -> &SummaryQueue {
        &self.queue
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }
}
