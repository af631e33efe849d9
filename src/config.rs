//! TOML configuration.
//!
//! ```toml
//! [store]
//! path = "/var/lib/sadb/sa.db"
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Every section is optional. `SADB_PATH` and `SADB_LOG_LEVEL` override the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SadbError};

pub const ENV_STORE_PATH: &str = "SADB_PATH";
pub const ENV_LOG_LEVEL: &str = "SADB_LOG_LEVEL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SadbConfig {
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file, or `:memory:`.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sadb.sqlite"),
        }
    }
}

#[cfg(feature = "sqlite")]
impl StoreConfig {
    pub fn open_sqlite(&self) -> Result<crate::storage::SqliteStore> {
        if self.path == Path::new(":memory:") {
            crate::storage::SqliteStore::open_in_memory()
        } else {
            crate::storage::SqliteStore::open(&self.path)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SadbConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SadbError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| SadbError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Apply `SADB_PATH` / `SADB_LOG_LEVEL` on top of the loaded values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_STORE_PATH).filter(|v| !v.is_empty()) {
            self.store.path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
            self.logging.level = level;
        }
    }
}
