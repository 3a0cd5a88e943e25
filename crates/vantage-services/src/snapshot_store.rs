//! Snapshot persistence — id-addressable copies of completed reports.
//!
//! Two interchangeable backends behind one trait: `SnapshotDb` (sqlite)
//! for deployment, `SnapshotMap` for tests and in-memory configs. Ids are
//! generated here, never supplied by clients.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use rusqlite::{Connection, OptionalExtension};

use vantage_core::report::ReportResponse;
use vantage_core::ReportError;

/// Key-value persistence for serialized report responses.
///
/// `put` overwrites on id collision (ids are generated and practically
/// never collide). `get` and `list` never mutate. Ordering of `list` is
/// unspecified.
pub trait SnapshotStore: Send + Sync {
    fn put(&self, id: &str, body: &str) -> Result<(), ReportError>;
    fn get(&self, id: &str) -> Result<Option<String>, ReportError>;
    fn list(&self) -> Result<Vec<String>, ReportError>;
}

// ── Id generation ─────────────────────────────────────────────────────────────

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a fresh snapshot id: hex BLAKE3 over wall clock and a
/// process-lifetime counter, so ids are unique even within one millisecond.
pub fn new_snapshot_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut h = blake3::Hasher::new();
    h.update(&now_ms().to_le_bytes());
    h.update(&seq.to_le_bytes());
    h.update(&std::process::id().to_le_bytes());
    hex::encode(h.finalize().as_bytes())
}

/// Assign a fresh id to `response`, serialize it in full, and store it.
/// Returns the id. The payload is captured as-is and never mutated after.
pub fn save_snapshot(
    store: &dyn SnapshotStore,
    response: &mut ReportResponse,
) -> Result<String, ReportError> {
    let id = new_snapshot_id();
    response.snapshot_id = Some(id.clone());
    let body = serde_json::to_string(response)?;
    store.put(&id, &body)?;
    Ok(id)
}

// ── Sqlite backend ────────────────────────────────────────────────────────────

/// Persistent snapshot store on sqlite.
///
/// The connection sits behind a mutex; snapshot traffic is light (one write
/// per completed report) so contention is not a concern.
#[derive(Clone)]
pub struct SnapshotDb {
    conn: Arc<Mutex<Connection>>,
}

impl SnapshotDb {
    pub fn open(path: &Path) -> Result<Self, ReportError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ReportError::Storage(anyhow::Error::new(e)))?;
        }
        let conn = Connection::open(path).map_err(storage_err)?;
        Self::init(conn)
    }

    /// Ephemeral database, for tests.
    pub fn open_in_memory() -> Result<Self, ReportError> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, ReportError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS snapshots (
                id         TEXT PRIMARY KEY,
                body       TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(storage_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ReportError> {
        self.conn
            .lock()
            .map_err(|_| ReportError::Storage(anyhow::anyhow!("snapshot db mutex poisoned")))
    }
}

fn storage_err(e: rusqlite::Error) -> ReportError {
    ReportError::Storage(anyhow::Error::new(e))
}

impl SnapshotStore for SnapshotDb {
    fn put(&self, id: &str, body: &str) -> Result<(), ReportError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO snapshots (id, body, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, body, now_ms() as i64],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<String>, ReportError> {
        let conn = self.lock()?;
        conn.query_row("SELECT body FROM snapshots WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()
        .map_err(storage_err)
    }

    fn list(&self) -> Result<Vec<String>, ReportError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id FROM snapshots")
            .map_err(storage_err)?;
        let ids = stmt
            .query_map([], |row| row.get(0))
            .map_err(storage_err)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(storage_err)?;
        Ok(ids)
    }
}

// ── In-memory backend ─────────────────────────────────────────────────────────

/// In-memory snapshot store.
#[derive(Clone, Default)]
pub struct SnapshotMap {
    snapshots: Arc<DashMap<String, String>>,
}

impl SnapshotMap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for SnapshotMap {
    fn put(&self, id: &str, body: &str) -> Result<(), ReportError> {
        self.snapshots.insert(id.to_string(), body.to_string());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<String>, ReportError> {
        Ok(self.snapshots.get(id).map(|b| b.value().clone()))
    }

    fn list(&self) -> Result<Vec<String>, ReportError> {
        Ok(self.snapshots.iter().map(|e| e.key().clone()).collect())
    }
}
