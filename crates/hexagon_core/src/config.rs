//! Runtime configuration for the core crate.
//!
//! # Responsibility
//! - Hold the knobs shared by logging and storage bootstrap.
//! - Load them from JSON documents or `HEXAGON_*` environment variables.
//!
//! # Invariants
//! - Missing keys fall back to `CoreConfig::default()`.
//! - Environment overrides are applied on top of an existing config, never
//!   replacing keys that are not set.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_LOG_LEVEL: &str = "HEXAGON_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "HEXAGON_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "HEXAGON_BUSY_TIMEOUT_MS";
pub const ENV_FOREIGN_KEYS: &str = "HEXAGON_FOREIGN_KEYS";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration load errors.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for {key}")
            }
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidValue { .. } => None,
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Process-level settings for logging and SQLite connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rotated log files. `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// Whether connections enable `PRAGMA foreign_keys`.
    pub foreign_keys: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
        }
    }
}

impl CoreConfig {
    /// Parses a JSON document; absent keys keep their defaults.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(document)?)
    }

    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_overrides(lookup)
    }

    /// Applies `HEXAGON_*` overrides returned by `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level.trim().to_string();
        }

        if let Some(dir) = lookup(ENV_LOG_DIR) {
            let trimmed = dir.trim();
            self.log_dir = if trimmed.is_empty() {
                None
            } else {
                Some(PathBuf::from(trimmed))
            };
        }

        if let Some(timeout) = lookup(ENV_BUSY_TIMEOUT_MS) {
            self.busy_timeout_ms =
                timeout
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_BUSY_TIMEOUT_MS,
                        value: timeout.clone(),
                    })?;
        }

        if let Some(flag) = lookup(ENV_FOREIGN_KEYS) {
            self.foreign_keys = parse_flag(&flag).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_FOREIGN_KEYS,
                value: flag.clone(),
            })?;
        }

        Ok(self)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ConfigError, ENV_BUSY_TIMEOUT_MS, ENV_FOREIGN_KEYS, ENV_LOG_DIR};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn json_document_keeps_defaults_for_missing_keys() {
        let config = CoreConfig::from_json_str(r#"{"busy_timeout_ms": 250}"#)
            .expect("partial document should parse");
        assert_eq!(config.busy_timeout_ms, 250);
        assert!(config.foreign_keys);
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn lookup_overrides_apply_on_top_of_defaults() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            (ENV_BUSY_TIMEOUT_MS, " 10 "),
            (ENV_FOREIGN_KEYS, "off"),
            (ENV_LOG_DIR, "/var/log/hexagon"),
        ]))
        .expect("overrides should apply");

        assert_eq!(config.busy_timeout_ms, 10);
        assert!(!config.foreign_keys);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/hexagon")));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = CoreConfig::from_lookup(lookup_from(&[(ENV_BUSY_TIMEOUT_MS, "soon")]))
            .expect_err("non-numeric timeout must fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: ENV_BUSY_TIMEOUT_MS,
                ..
            }
        ));
    }

    #[test]
    fn blank_log_dir_means_stderr() {
        let config = CoreConfig::from_lookup(lookup_from(&[(ENV_LOG_DIR, "   ")]))
            .expect("blank dir should be accepted");
        assert_eq!(config.log_dir, None);
    }
}
