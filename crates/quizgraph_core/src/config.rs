//! Process configuration from environment variables.
//!
//! # Responsibility
//! - Resolve database path, HTTP bind address and logging settings.
//! - Reject malformed values before any storage is touched.
//!
//! # Invariants
//! - Unset variables fall back to documented defaults.
//! - Set-but-invalid variables are errors, never silently defaulted.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "QUIZGRAPH_DB_PATH";
pub const ENV_BIND: &str = "QUIZGRAPH_BIND";
pub const ENV_LOG_LEVEL: &str = "QUIZGRAPH_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "QUIZGRAPH_LOG_DIR";

const DEFAULT_DB_PATH: &str = "quizgraph.sqlite3";
const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub variable: &'static str,
    pub message: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: {}", self.variable, self.message)
    }
}

impl Error for ConfigError {}

/// Resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub log_level: &'static str,
    /// Rolling log file directory; `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value when set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_path = PathBuf::from(read(ENV_DB_PATH).unwrap_or_else(|| DEFAULT_DB_PATH.into()));

        let bind_text = read(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.into());
        let bind_addr = bind_text.trim().parse().map_err(|err| ConfigError {
            variable: ENV_BIND,
            message: format!("`{bind_text}` is not a socket address: {err}"),
        })?;

        let log_level = match read(ENV_LOG_LEVEL) {
            Some(level) => normalize_level(&level).map_err(|message| ConfigError {
                variable: ENV_LOG_LEVEL,
                message,
            })?,
            None => default_log_level(),
        };

        let log_dir = read(ENV_LOG_DIR)
            .map(|dir| normalize_log_dir(&dir))
            .transpose()
            .map_err(|message| ConfigError {
                variable: ENV_LOG_DIR,
                message,
            })?;

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            log_dir,
        })
    }
}
