//! Core configuration.
//!
//! # Responsibility
//! - Describe the settings the core needs at process startup.
//! - Load them from TOML with defaults for every field.
//!
//! # Invariants
//! - `grace_window_minutes` is never negative.
//! - A missing `db_path` means an in-memory store.

use chrono::TimeDelta;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Grace window of the reference deployment.
pub const DEFAULT_GRACE_WINDOW_MINUTES: i64 = 60;

/// Startup configuration for the event store and lifecycle services.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite database file. `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    /// Minutes after an occurrence starts during which older responses stay current.
    pub grace_window_minutes: i64,
    /// `trace|debug|info|warn|error`; defaults per build mode.
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files. `None` logs to stderr.
    pub log_dir: Option<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            grace_window_minutes: DEFAULT_GRACE_WINDOW_MINUTES,
            log_level: None,
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grace_window_minutes < 0 {
            return Err(ConfigError::Invalid(format!(
                "grace_window_minutes must not be negative, got {}",
                self.grace_window_minutes
            )));
        }
        if TimeDelta::try_minutes(self.grace_window_minutes).is_none() {
            return Err(ConfigError::Invalid(format!(
                "grace_window_minutes is out of range: {}",
                self.grace_window_minutes
            )));
        }
        Ok(())
    }

    pub fn grace_window(&self) -> TimeDelta {
        TimeDelta::try_minutes(self.grace_window_minutes).unwrap_or(TimeDelta::zero())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
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

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, DEFAULT_GRACE_WINDOW_MINUTES};
    use chrono::TimeDelta;
    use std::path::PathBuf;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_toml_str("").expect("empty config should parse");
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.grace_window(), TimeDelta::minutes(DEFAULT_GRACE_WINDOW_MINUTES));
    }

    #[test]
    fn fields_are_read_from_toml() {
        let config = CoreConfig::from_toml_str(
            r#"
            db_path = "/var/lib/thrsqr/events.sqlite3"
            grace_window_minutes = 90
            log_level = "debug"
            "#,
        )
        .expect("valid config should parse");
        assert_eq!(
            config.db_path,
            Some(PathBuf::from("/var/lib/thrsqr/events.sqlite3"))
        );
        assert_eq!(config.grace_window(), TimeDelta::minutes(90));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn negative_grace_window_is_rejected() {
        let err = CoreConfig::from_toml_str("grace_window_minutes = -5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CoreConfig::from_toml_str("grace_window = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
