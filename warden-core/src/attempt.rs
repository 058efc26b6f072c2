//! Failed-attempt ledger entries
//!
//! Every refused authentication attempt appends exactly one entry here. The
//! ledger is append-only: entries are never updated, and time-windowed counts
//! over it drive the source-address cooldown track.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Why an authentication attempt was refused.
///
/// The distinction between `UnknownUsername` and `BadPassword` exists only in
/// the ledger; callers always see the same generic rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    UnknownUsername,
    BadPassword,
    AccountLocked,
    SourceBlocked,
}

impl FailureReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FailureReason::UnknownUsername => "UNKNOWN_USERNAME",
            FailureReason::BadPassword => "BAD_PASSWORD",
            FailureReason::AccountLocked => "ACCOUNT_LOCKED",
            FailureReason::SourceBlocked => "SOURCE_BLOCKED",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureReason {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNKNOWN_USERNAME" => Ok(FailureReason::UnknownUsername),
            "BAD_PASSWORD" => Ok(FailureReason::BadPassword),
            "ACCOUNT_LOCKED" => Ok(FailureReason::AccountLocked),
            "SOURCE_BLOCKED" => Ok(FailureReason::SourceBlocked),
            other => Err(ValidationError::InvalidField(format!(
                "failure reason: {other}"
            ))),
        }
    }
}

/// A recorded failed authentication attempt.
///
/// The username may not resolve to a real account; attempts against unknown
/// usernames are recorded all the same so enumeration probing is visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAttempt {
    pub id: i64,
    pub username: String,
    pub source_addr: String,
    pub user_agent: Option<String>,
    pub reason: FailureReason,
    pub suspicious: bool,
    pub attempted_at: DateTime<Utc>,
}

/// A ledger entry that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewFailedAttempt {
    pub username: String,
    pub source_addr: String,
    pub user_agent: Option<String>,
    pub reason: FailureReason,
    pub suspicious: bool,
    pub attempted_at: DateTime<Utc>,
}

/// Aggregate over ledger entries inside a trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AttemptStats {
    pub count: u32,
    pub latest_at: Option<DateTime<Utc>>,
}
