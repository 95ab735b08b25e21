//! Process-level configuration for hosts embedding the core.
//!
//! # Responsibility
//! - Resolve database location, logging and rollback policy from the
//!   environment or from a JSON document.
//! - Open the configured store and start logging from one place.
//!
//! # Invariants
//! - Missing values fall back to defaults; malformed values are errors.

use crate::engine::drag::RollbackPolicy;
use crate::logging::{default_log_level, init_logging};
use crate::repo::section_repo::{SqliteOrderStore, StoreResult};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "CLASSDECK_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "CLASSDECK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CLASSDECK_LOG_DIR";
pub const ENV_ROLLBACK: &str = "CLASSDECK_ROLLBACK";

/// Errors while resolving configuration.
#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    /// Rollback policy value is not recognized.
    InvalidRollbackPolicy(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid config json: {err}"),
            Self::InvalidRollbackPolicy(value) => write!(
                f,
                "unsupported rollback policy `{value}`; expected keep_optimistic|restore_pre_move"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::InvalidRollbackPolicy(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite file; `None` keeps the database in memory.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute log directory; `None` disables file logging.
    pub log_dir: Option<String>,
    pub rollback_policy: RollbackPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            rollback_policy: RollbackPolicy::default(),
        }
    }
}

impl CoreConfig {
    /// Reads `CLASSDECK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parses a JSON config document; absent fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Resolves configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();
        if let Some(path) = non_empty(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            config.log_level = level.trim().to_string();
        }
        if let Some(dir) = non_empty(ENV_LOG_DIR) {
            config.log_dir = Some(dir.trim().to_string());
        }
        if let Some(value) = non_empty(ENV_ROLLBACK) {
            config.rollback_policy = RollbackPolicy::parse(&value)
                .ok_or_else(|| ConfigError::InvalidRollbackPolicy(value.trim().to_string()))?;
        }
        Ok(config)
    }

    /// Opens the configured store, applying migrations.
    pub fn open_store(&self) -> StoreResult<SqliteOrderStore> {
        match &self.db_path {
            Some(path) => SqliteOrderStore::open(path),
            None => SqliteOrderStore::open_in_memory(),
        }
    }

    /// Starts file logging when a log directory is configured.
    ///
    /// Returns `Ok(false)` when file logging is disabled.
    pub fn init_logging(&self) -> Result<bool, String> {
        match &self.log_dir {
            Some(dir) => init_logging(&self.log_level, dir).map(|()| true),
            None => Ok(false),
        }
    }
}
