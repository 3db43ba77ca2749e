//! File-based store configuration.
//!
//! # Responsibility
//! - Describe database and logging parameters consumed at startup.
//! - Load them from a TOML document with defaults for every key.
//!
//! # Invariants
//! - A loaded config is always validated before it is returned.
//! - `path = ":memory:"` selects an in-memory database with a single
//!   pooled connection.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Sentinel database path selecting an in-memory SQLite database.
pub const IN_MEMORY_PATH: &str = ":memory:";

const DEFAULT_DB_FILE_NAME: &str = "todolist.sqlite3";
const DEFAULT_POOL_SIZE: u32 = 8;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 5_000;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while reading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Config document is not valid TOML or has unexpected keys/types.
    Parse(toml::de::Error),
    /// Config parsed but violates a value constraint.
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::Invalid(message) => write!(f, "invalid config value: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl StoreConfig {
    /// Reads and validates a TOML config file.
    ///
    /// # Errors
    /// - `ConfigError::Io` when the file cannot be read.
    /// - `ConfigError::Parse` / `ConfigError::Invalid` as for
    ///   [`StoreConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates a TOML config document.
    ///
    /// Missing tables and keys fall back to defaults; unknown keys are
    /// rejected so typos surface at startup.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value constraints of every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.database.validate()?;
        self.logging.validate()
    }
}

/// Connection factory parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`.
    pub path: PathBuf,
    /// Maximum pooled connections. Ignored (forced to 1) for in-memory databases.
    pub pool_size: u32,
    /// SQLite busy handler timeout applied to every connection.
    pub busy_timeout_ms: u64,
    /// Maximum wait for a free pooled connection.
    pub connection_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            pool_size: DEFAULT_POOL_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
        }
    }
}

impl DatabaseConfig {
    /// Default parameters pointing at a file path.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Default parameters for a private in-memory database.
    pub fn in_memory() -> Self {
        Self::file(IN_MEMORY_PATH)
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == IN_MEMORY_PATH
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path cannot be empty".to_string()));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid(
                "database.pool_size must be at least 1".to_string(),
            ));
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "database.busy_timeout_ms must be positive".to_string(),
            ));
        }
        if self.connection_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "database.connection_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging parameters. Logging stays disabled when `dir` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: None,
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        crate::logging::normalize_level(&self.level).map_err(ConfigError::Invalid)?;
        if let Some(dir) = &self.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}
