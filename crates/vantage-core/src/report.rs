//! Report domain types — scopes, poll directives, statuses, and responses.
//!
//! A report is requested by polling: the client sends a directive, gets back
//! the current status, and re-polls until the computation is terminal.

use serde::{Deserialize, Serialize};

// ── Scope ─────────────────────────────────────────────────────────────────────

/// Identity of the logical caller that owns a poll loop.
///
/// Concurrent requests with the same owner and org share one computation.
/// The scheduler uses `System` so its firings coalesce across periods.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerId {
    /// A human caller, keyed by their opaque session string.
    Session(String),
    /// The auto-snapshot scheduler's synthetic identity.
    System,
}

/// Coalescing key for one in-flight report computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Organizational filter the report is computed over.
    pub org: String,
    /// Who owns attach/detach bookkeeping for this computation.
    pub owner: OwnerId,
}

impl Scope {
    pub fn new(org: impl Into<String>, owner: OwnerId) -> Self {
        Self {
            org: org.into(),
            owner,
        }
    }

    /// The scheduler's fixed scope: neutral org, synthetic owner.
    pub fn system(org: impl Into<String>) -> Self {
        Self::new(org, OwnerId::System)
    }
}

// ── Directives ────────────────────────────────────────────────────────────────

/// What the caller wants this poll call to do to the computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingDirective {
    /// Begin a computation if none is running, else attach to the running one.
    Start,
    /// Attach only. Never begins a computation.
    NoStart,
    /// Cancel the in-flight computation for this scope, if any.
    ForceStop,
}

/// What the caller wants done with the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotDirective {
    /// No persistence.
    #[default]
    None,
    /// Persist the result as a snapshot once the computation is ready.
    Create,
    /// Serve a previously stored snapshot by id. Bypasses the queue entirely.
    Show,
}

// ── Status ────────────────────────────────────────────────────────────────────

/// Lifecycle state of one report computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Queued, not yet started.
    Waiting,
    /// In progress.
    Processing,
    /// Terminal: the report is complete and the payload is valid.
    Ready,
    /// Terminal: force-stopped before completion.
    Stopped,
    /// Terminal: the computation itself failed.
    Failed,
}

impl ReportStatus {
    /// True for the states that warrant re-polling.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Waiting | Self::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }
}

// ── Response ──────────────────────────────────────────────────────────────────

/// One poll's view of a computation. Built fresh per call, immutable after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub status: ReportStatus,
    /// Completion estimate, 0–100.
    pub percent: u8,
    /// Report payload. Only meaningful when status is `Ready`.
    pub payload: String,
    /// Set when this response was persisted as a snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
}

impl ReportResponse {
    /// A `Waiting` response with no content — the no-op shape returned when
    /// `NoStart` finds nothing registered.
    pub fn waiting() -> Self {
        Self {
            status: ReportStatus::Waiting,
            percent: 0,
            payload: String::new(),
            snapshot_id: None,
        }
    }

    /// The shape returned after a force-stop.
    pub fn stopped() -> Self {
        Self {
            status: ReportStatus::Stopped,
            percent: 0,
            payload: String::new(),
            snapshot_id: None,
        }
    }
}
