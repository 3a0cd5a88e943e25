//! HTTP API handlers — exposes the report pipeline as JSON.

pub mod report;
pub mod status;

use axum::http::{HeaderMap, StatusCode};

use vantage_core::ReportError;
use vantage_services::{Caller, ReportHandler, SummaryQueue};

/// Header carrying the caller's opaque session id.
pub const SESSION_HEADER: &str = "x-vantage-session";
/// Header carrying the organizational filter. Optional.
pub const ORG_HEADER: &str = "x-vantage-org";

#[derive(Clone)]
pub struct ApiState {
    pub handler: ReportHandler,
    pub queue: SummaryQueue,
    pub scheduler_enabled: bool,
    /// Shutdown broadcast sender — signals graceful daemon shutdown.
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Build the caller identity from request headers.
///
/// Authentication mechanics live outside this core; the session header is
/// treated as an already-verified opaque identity. Missing session → 401.
fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, (StatusCode, String)> {
    let session = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or((
            StatusCode::UNAUTHORIZED,
            format!("missing {SESSION_HEADER} header"),
        ))?;
    let org = headers
        .get(ORG_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    Ok(Caller::new(session, org))
}

/// Map pipeline errors onto HTTP statuses.
fn error_response(err: ReportError) -> (StatusCode, String) {
    let status = match &err {
        ReportError::Forbidden => StatusCode::FORBIDDEN,
        ReportError::SnapshotNotFound(_) => StatusCode::NOT_FOUND,
        ReportError::Storage(_) | ReportError::Serialization(_) | ReportError::Oracle(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

// Re-export handler functions for use in router setup.
pub use report::{handle_snapshot_list, handle_summary};
pub use status::{handle_shutdown, handle_status};
