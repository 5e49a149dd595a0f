use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants;
use crate::error::ConfigError;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "ingest.toml";

/// Re-roots every default path (`raw/`, `rejected/`, `audit/`, database)
pub const ENV_DATA_DIR: &str = "INGEST_DATA_DIR";
/// Overrides the database path only
pub const ENV_DB_PATH: &str = "INGEST_DB_PATH";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Simulated object storage for uploaded client files
    pub raw_root: PathBuf,
    /// Client-scoped quarantine reports
    pub quarantine_root: PathBuf,
    /// JSON audit documents
    pub audit_root: PathBuf,
    pub database_path: PathBuf,
}

impl PathsConfig {
    /// Default layout rooted at `data_dir`
    pub fn rooted_at(data_dir: &Path) -> Self {
        Self {
            raw_root: data_dir.join(constants::RAW_DIR),
            quarantine_root: data_dir.join(constants::REJECTED_DIR),
            audit_root: data_dir.join(constants::AUDIT_DIR),
            database_path: data_dir.join(constants::DATABASE_FILE),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self::rooted_at(Path::new(constants::DEFAULT_DATA_DIR))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file_name: String,
    /// Write the rolling file as JSON lines
    pub json_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_name: "member_ingest.log".to_string(),
            json_file: true,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `ingest.toml` in the working
    /// directory is used when present, otherwise built-in defaults. Environment
    /// overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                Self::default()
            }
        };

        config.apply_overrides(
            std::env::var(ENV_DATA_DIR).ok().as_deref(),
            std::env::var(ENV_DB_PATH).ok().as_deref(),
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `INGEST_DATA_DIR` / `INGEST_DB_PATH` style overrides
    pub fn apply_overrides(&mut self, data_dir: Option<&str>, db_path: Option<&str>) {
        if let Some(dir) = data_dir.filter(|d| !d.trim().is_empty()) {
            self.paths = PathsConfig::rooted_at(Path::new(dir));
        }
        if let Some(db) = db_path.filter(|d| !d.trim().is_empty()) {
            self.paths.database_path = PathBuf::from(db);
        }
    }
}
