//! Vantage service layer — the report pipeline behind the HTTP surface.
//!
//! `SummaryQueue` coalesces concurrent callers onto one computation per
//! scope, `ReportHandler` drives single poll cycles and snapshot
//! persistence, and `auto_snapshot` runs the same loop unattended on a
//! schedule.

pub mod auth;
pub mod auto_snapshot;
pub mod handler;
pub mod oracle;
pub mod queue;
pub mod snapshot_store;

pub use auth::{Authorizer, Caller, StaticAuthorizer};
pub use auto_snapshot::{AutoSnapshot, SchedulerHandle};
pub use handler::{ReportHandler, ReportReply, ReportRequest};
pub use oracle::{BuildProgress, OracleReport, ProgressOracle, ReportBuilder, ThreadedOracle};
pub use queue::{InFlightInfo, SummaryQueue};
pub use snapshot_store::{new_snapshot_id, save_snapshot, SnapshotDb, SnapshotMap, SnapshotStore};
