//! Threshold and window configuration
//!
//! All limits are injected values rather than process-wide statics so the
//! policy and services can be constructed with per-test overrides.

use std::collections::HashMap;

use chrono::Duration;

use crate::error::{Error, ValidationError};

pub const ENV_MAX_ACCOUNT_ATTEMPTS: &str = "WARDEN_MAX_ACCOUNT_ATTEMPTS";
pub const ENV_ACCOUNT_LOCKOUT_MINUTES: &str = "WARDEN_ACCOUNT_LOCKOUT_MINUTES";
pub const ENV_MAX_SOURCE_ATTEMPTS: &str = "WARDEN_MAX_SOURCE_ATTEMPTS";
pub const ENV_SOURCE_WINDOW_MINUTES: &str = "WARDEN_SOURCE_WINDOW_MINUTES";
pub const ENV_SOURCE_HOURLY_THRESHOLD: &str = "WARDEN_SOURCE_HOURLY_THRESHOLD";
pub const ENV_RETENTION_HOURS: &str = "WARDEN_RETENTION_HOURS";

/// Limits governing the account-lockout and source-cooldown tracks.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Consecutive failures before an account locks.
    pub max_account_attempts: u32,
    /// How long a locked account stays locked.
    pub account_lockout_window: Duration,
    /// In-window failures before a source address is refused.
    pub max_source_attempts: u32,
    /// Trailing window for the source-address tally.
    pub source_window: Duration,
    /// Secondary hourly threshold used only by the suspicion heuristics.
    pub source_hourly_threshold: u32,
    /// How long ledger entries are kept before maintenance pruning.
    pub retention_period: Duration,
    /// Clear a source address's ledger entries when a login from it succeeds.
    pub reset_source_on_success: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_account_attempts: 5,
            account_lockout_window: Duration::minutes(15),
            max_source_attempts: 10,
            source_window: Duration::minutes(30),
            source_hourly_threshold: 15,
            retention_period: Duration::hours(24),
            reset_source_on_success: false,
        }
    }
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_account_attempts(mut self, max: u32) -> Self {
        self.max_account_attempts = max;
        self
    }

    pub fn with_account_lockout_window(mut self, window: Duration) -> Self {
        self.account_lockout_window = window;
        self
    }

    pub fn with_max_source_attempts(mut self, max: u32) -> Self {
        self.max_source_attempts = max;
        self
    }

    pub fn with_source_window(mut self, window: Duration) -> Self {
        self.source_window = window;
        self
    }

    pub fn with_source_hourly_threshold(mut self, threshold: u32) -> Self {
        self.source_hourly_threshold = threshold;
        self
    }

    pub fn with_retention_period(mut self, period: Duration) -> Self {
        self.retention_period = period;
        self
    }

    pub fn with_reset_source_on_success(mut self, reset: bool) -> Self {
        self.reset_source_on_success = reset;
        self
    }

    /// Build a config from the process environment, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(std::env::vars())
    }

    /// Build a config from an explicit set of variables. Backs [`from_env`]
    /// and lets tests inject values without touching the process environment.
    ///
    /// [`from_env`]: AuthConfig::from_env
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, Error> {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let mut config = Self::default();

        if let Some(value) = vars.get(ENV_MAX_ACCOUNT_ATTEMPTS) {
            config.max_account_attempts = parse_count(ENV_MAX_ACCOUNT_ATTEMPTS, value)?;
        }
        if let Some(value) = vars.get(ENV_ACCOUNT_LOCKOUT_MINUTES) {
            config.account_lockout_window =
                Duration::minutes(parse_positive(ENV_ACCOUNT_LOCKOUT_MINUTES, value)?);
        }
        if let Some(value) = vars.get(ENV_MAX_SOURCE_ATTEMPTS) {
            config.max_source_attempts = parse_count(ENV_MAX_SOURCE_ATTEMPTS, value)?;
        }
        if let Some(value) = vars.get(ENV_SOURCE_WINDOW_MINUTES) {
            config.source_window =
                Duration::minutes(parse_positive(ENV_SOURCE_WINDOW_MINUTES, value)?);
        }
        if let Some(value) = vars.get(ENV_SOURCE_HOURLY_THRESHOLD) {
            config.source_hourly_threshold = parse_count(ENV_SOURCE_HOURLY_THRESHOLD, value)?;
        }
        if let Some(value) = vars.get(ENV_RETENTION_HOURS) {
            config.retention_period = Duration::hours(parse_positive(ENV_RETENTION_HOURS, value)?);
        }

        Ok(config)
    }
}

pub(crate) fn parse_count(name: &str, value: &str) -> Result<u32, Error> {
    let parsed: u32 = value
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidField(format!("{name}: {value}")))?;
    if parsed == 0 {
        return Err(ValidationError::InvalidField(format!("{name} must be positive")).into());
    }
    Ok(parsed)
}

pub(crate) fn parse_positive(name: &str, value: &str) -> Result<i64, Error> {
    let parsed: i64 = value
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidField(format!("{name}: {value}")))?;
    if parsed <= 0 {
        return Err(ValidationError::InvalidField(format!("{name} must be positive")).into());
    }
    Ok(parsed)
}
