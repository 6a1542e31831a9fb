//! Runtime configuration for TutorHub entry points.
//!
//! # Responsibility
//! - Collect database location, logging settings and the store retry policy.
//! - Read overrides from `TUTORHUB_*` environment variables.
//!
//! # Invariants
//! - Missing variables fall back to defaults; malformed ones are errors.
//! - `retry.max_attempts()` is always >= 1.

use crate::db::retry::{RetryPolicy, DEFAULT_BACKOFF};
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "TUTORHUB_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TUTORHUB_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TUTORHUB_LOG_DIR";
pub const ENV_STORE_MAX_ATTEMPTS: &str = "TUTORHUB_STORE_MAX_ATTEMPTS";

pub const DEFAULT_DB_FILE_NAME: &str = "tutorhub.sqlite3";

/// Configuration parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidMaxAttempts(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMaxAttempts(value) => write!(
                f,
                "{ENV_STORE_MAX_ATTEMPTS} must be a positive integer, got `{value}`"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Settings shared by every entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Logging stays disabled when `None`.
    pub log_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl CoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(db_path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(db_path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);
        if let Some(raw) = read(ENV_STORE_MAX_ATTEMPTS) {
            config.retry = RetryPolicy::new(parse_max_attempts(&raw)?, DEFAULT_BACKOFF);
        }
        Ok(config)
    }

    /// Replaces the retry attempt budget, keeping the backoff.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(max_attempts.to_string()));
        }
        self.retry = RetryPolicy::new(max_attempts, self.retry.backoff());
        Ok(self)
    }
}

fn parse_max_attempts(raw: &str) -> Result<u32, ConfigError> {
    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidMaxAttempts(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_STORE_MAX_ATTEMPTS};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_values_use_defaults() {
        let config = CoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.retry.max_attempts(), 3);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = CoreConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/tmp/school.db"),
            (ENV_LOG_DIR, " /tmp/logs "),
            (ENV_STORE_MAX_ATTEMPTS, "5"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/school.db"));
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(config.retry.max_attempts(), 5);
    }

    #[test]
    fn zero_or_garbage_attempts_are_rejected() {
        for raw in ["0", "three", "-1"] {
            let err = CoreConfig::from_lookup(lookup(&[(ENV_STORE_MAX_ATTEMPTS, raw)])).unwrap_err();
            assert_eq!(err, ConfigError::InvalidMaxAttempts(raw.to_string()));
        }
        assert!(CoreConfig::default().with_max_attempts(0).is_err());
    }
}
