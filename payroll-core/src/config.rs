//! Runtime configuration.
//!
//! ```toml
//! tables_dir = "/etc/payroll/tables/2025"
//!
//! [database]
//! backend = "sqlite"
//! connection_string = "payroll.db"
//!
//! [rewards]
//! points_per_paystub = 10
//! ```
//!
//! Every section is optional. Environment variables override the file:
//!
//! | variable             | field                        |
//! |----------------------|------------------------------|
//! | `PAYROLL_DB_BACKEND` | `database.backend`           |
//! | `PAYROLL_DB_URL`     | `database.connection_string` |
//! | `PAYROLL_TABLES_DIR` | `tables_dir`                 |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DbConfig;
use crate::quota::RewardsConfig;

pub const ENV_DB_BACKEND: &str = "PAYROLL_DB_BACKEND";
pub const ENV_DB_URL: &str = "PAYROLL_DB_URL";
pub const ENV_TABLES_DIR: &str = "PAYROLL_TABLES_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PayrollConfig {
    pub database: DbConfig,
    /// Directory of jurisdiction CSVs replacing the bundled tables.
    pub tables_dir: Option<PathBuf>,
    pub rewards: RewardsConfig,
}

impl PayrollConfig {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `PAYROLL_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its
    /// value. Empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(backend) = get(ENV_DB_BACKEND) {
            self.database.backend = backend;
        }
        if let Some(url) = get(ENV_DB_URL) {
            self.database.connection_string = url;
        }
        if let Some(dir) = get(ENV_TABLES_DIR) {
            self.tables_dir = Some(PathBuf::from(dir));
        }
        self
    }
}
