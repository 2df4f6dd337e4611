//! Runtime configuration for the scope bootstrap.
//!
//! # Responsibility
//! - Parse JSON configuration supplied by the embedding process.
//! - Provide defaults that match the historical lazy-bootstrap behavior.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// What happens to registrations that arrive after the root scope exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateRegistrationPolicy {
    /// Keep the registration in the registry, leave the root untouched, log a warning.
    #[default]
    Ignore,
    /// Refuse the registration; fatal through the panicking entry points.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub late_registration: LateRegistrationPolicy,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; stderr when absent.
    pub log_dir: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            late_registration: LateRegistrationPolicy::default(),
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    /// Returns the logging target this configuration asks for.
    pub fn log_target(&self) -> crate::logging::LogTarget {
        match &self.log_dir {
            Some(dir) => crate::logging::LogTarget::Directory(dir.clone()),
            None => crate::logging::LogTarget::Stderr,
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Read { path: PathBuf, reason: String },
    Parse(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, reason } => {
                write!(f, "failed to read config `{}`: {reason}", path.display())
            }
            Self::Parse(reason) => write!(f, "config is not valid JSON: {reason}"),
        }
    }
}

impl Error for ConfigError {}
