//! Configuration system for Vantage.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $VANTAGE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/vantage/config.toml
//!   3. ~/.config/vantage/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VantageConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub scheduler: SchedulerSettings,
    pub auth: AuthConfig,
    pub oracle: OracleSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// TCP port the JSON API listens on.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the snapshot database file.
    pub db_path: PathBuf,
    /// Use the in-memory snapshot store instead of the database.
    pub in_memory: bool,
}

/// Auto-snapshot scheduler knobs.
///
/// The delay/period defaults mirror the reference deployment: first firing
/// two minutes after startup, then once per day. Placeholder values until a
/// real scheduling requirement lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// If false the scheduler is never spawned.
    pub enabled: bool,
    pub initial_delay_minutes: u64,
    pub period_minutes: u64,
    /// Sleep between polls while a firing waits for the computation.
    pub poll_backoff_secs: u64,
    /// Organizational filter used for automatic snapshots.
    pub neutral_org: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// If true, any caller with a session may request reports.
    pub allow_all_reports: bool,
    /// Session ids allowed to request reports when `allow_all_reports` is off.
    pub reporters: Vec<String>,
    /// Session ids additionally allowed to create snapshots.
    pub snapshot_creators: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    /// Number of report sections the local oracle builds per run.
    pub section_count: u32,
    /// Pause between sections, in milliseconds.
    pub section_delay_ms: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for VantageConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
            scheduler: SchedulerSettings::default(),
            auth: AuthConfig::default(),
            oracle: OracleSettings::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 7760 }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: data_dir().join("snapshots.db"),
            in_memory: false,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_delay_minutes: 2,
            period_minutes: 1440, // once per day
            poll_backoff_secs: 10,
            neutral_org: "all".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_all_reports: true,
            reporters: Vec::new(),
            snapshot_creators: Vec::new(),
        }
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            section_count: 10,
            section_delay_ms: 500,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("vantage")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("vantage")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl VantageConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            VantageConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("VANTAGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&VantageConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply VANTAGE_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VANTAGE_API__PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
        if let Ok(v) = std::env::var("VANTAGE_STORAGE__DB_PATH") {
            self.storage.db_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("VANTAGE_STORAGE__IN_MEMORY") {
            if let Ok(b) = v.parse() {
                self.storage.in_memory = b;
            }
        }
        if let Ok(v) = std::env::var("VANTAGE_SCHEDULER__ENABLED") {
            if let Ok(b) = v.parse() {
                self.scheduler.enabled = b;
            }
        }
        if let Ok(v) = std::env::var("VANTAGE_SCHEDULER__INITIAL_DELAY_MINUTES") {
            if let Ok(n) = v.parse() {
                self.scheduler.initial_delay_minutes = n;
            }
        }
        if let Ok(v) = std::env::var("VANTAGE_SCHEDULER__PERIOD_MINUTES") {
            if let Ok(n) = v.parse() {
                self.scheduler.period_minutes = n;
            }
        }
        if let Ok(v) = std::env::var("VANTAGE_SCHEDULER__POLL_BACKOFF_SECS") {
            if let Ok(n) = v.parse() {
                self.scheduler.poll_backoff_secs = n;
            }
        }
        if let Ok(v) = std::env::var("VANTAGE_AUTH__ALLOW_ALL_REPORTS") {
            if let Ok(b) = v.parse() {
                self.auth.allow_all_reports = b;
            }
        }
    }
}
