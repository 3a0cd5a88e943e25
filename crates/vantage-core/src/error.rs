//! Error taxonomy for the report pipeline.

/// Faults surfaced by the handler, queue, and stores.
///
/// `Forbidden` and `SnapshotNotFound` are caller errors and cause no state
/// change. `Storage`, `Serialization`, and `Oracle` are infrastructure
/// faults that propagate to the immediate caller; the scheduler catches
/// them per firing instead of dying.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("caller is not authorized for this request")]
    Forbidden,

    #[error("snapshot {0} not found")]
    SnapshotNotFound(String),

    #[error("snapshot storage failure: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("response serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("progress oracle failure: {0}")]
    Oracle(#[source] anyhow::Error),
}
