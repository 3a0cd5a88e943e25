//! Authorization — capability predicates consumed by the report handler.
//!
//! Authentication itself lives outside this crate; callers arrive already
//! identified by an opaque session string. This module only answers "may
//! this caller do that" as booleans.

use std::collections::HashSet;

use vantage_core::config::AuthConfig;

/// An identified caller: opaque session id plus their organizational filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub session: String,
    pub org: String,
}

impl Caller {
    pub fn new(session: impl Into<String>, org: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            org: org.into(),
        }
    }
}

/// Capability checks the handler consults before touching the queue.
pub trait Authorizer: Send + Sync {
    fn can_request_reports(&self, caller: &Caller) -> bool;

    /// Snapshot creation is a separate, stricter capability.
    fn can_create_snapshots(&self, caller: &Caller) -> bool;
}

/// Config-driven authorizer: allow-lists of session ids.
pub struct StaticAuthorizer {
    allow_all_reports: bool,
    reporters: HashSet<String>,
    snapshot_creators: HashSet<String>,
}

impl StaticAuthorizer {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            allow_all_reports: config.allow_all_reports,
            reporters: config.reporters.iter().cloned().collect(),
            snapshot_creators: config.snapshot_creators.iter().cloned().collect(),
        }
    }
}

impl Authorizer for StaticAuthorizer {
    fn can_request_reports(&self, caller: &Caller) -> bool {
        self.allow_all_reports || self.reporters.contains(&caller.session)
    }

    fn can_create_snapshots(&self, caller: &Caller) -> bool {
        self.can_request_reports(caller) && self.snapshot_creators.contains(&caller.session)
    }
}
