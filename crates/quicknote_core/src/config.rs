//! Environment-driven runtime configuration.
//!
//! # Responsibility
//! - Resolve database path, logging and autosave timings from environment
//!   variables with stable defaults.
//!
//! # Invariants
//! - Blank variables behave as unset.
//! - Malformed durations are reported, never silently replaced.

use crate::logging::default_log_level;
use crate::session::scheduler::{AutosavePolicy, DEFAULT_AUTOSAVE_INTERVAL, DEFAULT_QUIET_PERIOD};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "QUICKNOTE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "QUICKNOTE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "QUICKNOTE_LOG_DIR";
pub const ENV_DEBOUNCE_MS: &str = "QUICKNOTE_DEBOUNCE_MS";
pub const ENV_AUTOSAVE_INTERVAL_MS: &str = "QUICKNOTE_AUTOSAVE_INTERVAL_MS";

const DEFAULT_DB_FILE_NAME: &str = "quicknote.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "quicknote-logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidDuration { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDuration { key, value } => write!(
                f,
                "`{key}` must be a whole number of milliseconds, got `{value}`"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuicknoteConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub quiet_period: Duration,
    pub autosave_interval: Duration,
}

impl QuicknoteConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|trimmed| !trimmed.is_empty())
        };

        let db_path = value(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));
        let log_level = value(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string());
        let log_dir = value(ENV_LOG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME));
        let quiet_period =
            parse_millis(ENV_DEBOUNCE_MS, value(ENV_DEBOUNCE_MS))?.unwrap_or(DEFAULT_QUIET_PERIOD);
        let autosave_interval = parse_millis(
            ENV_AUTOSAVE_INTERVAL_MS,
            value(ENV_AUTOSAVE_INTERVAL_MS),
        )?
        .unwrap_or(DEFAULT_AUTOSAVE_INTERVAL);

        Ok(Self {
            db_path,
            log_level,
            log_dir,
            quiet_period,
            autosave_interval,
        })
    }

    /// Policy for the note detail screen (debounce only).
    pub fn detail_policy(&self) -> AutosavePolicy {
        AutosavePolicy::new(self.quiet_period, None)
    }

    /// Policy for the new-note composer (debounce plus interval).
    pub fn composer_policy(&self) -> AutosavePolicy {
        AutosavePolicy::new(self.quiet_period, Some(self.autosave_interval))
    }
}

fn parse_millis(key: &'static str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    raw.map(|value| {
        value
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidDuration { key, value })
    })
    .transpose()
}
