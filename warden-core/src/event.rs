//! Security event classification
//!
//! Events are the append-only audit product of the defense core. The core
//! writes them; audit and reporting subsystems only read them. Resolution is
//! an operator action recorded via the `resolved` flag.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Classified incident types, ordered here from least to most severe form of
/// the same underlying signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEventKind {
    SuspiciousPattern,
    UsernameEnumeration,
    SourceCooldownTriggered,
    BruteForceAccount,
    BruteForceSource,
}

impl SecurityEventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SecurityEventKind::SuspiciousPattern => "SUSPICIOUS_PATTERN",
            SecurityEventKind::UsernameEnumeration => "USERNAME_ENUMERATION",
            SecurityEventKind::SourceCooldownTriggered => "SOURCE_COOLDOWN_TRIGGERED",
            SecurityEventKind::BruteForceAccount => "BRUTE_FORCE_ACCOUNT",
            SecurityEventKind::BruteForceSource => "BRUTE_FORCE_SOURCE",
        }
    }

    /// Rank used when one request raises several candidate events and only
    /// the most significant one is written.
    pub const fn priority(&self) -> u8 {
        match self {
            SecurityEventKind::SuspiciousPattern => 0,
            SecurityEventKind::UsernameEnumeration => 1,
            SecurityEventKind::SourceCooldownTriggered => 2,
            SecurityEventKind::BruteForceAccount => 3,
            SecurityEventKind::BruteForceSource => 4,
        }
    }

    /// The severity an event of this kind is written with.
    pub const fn severity(&self) -> Severity {
        match self {
            SecurityEventKind::SuspiciousPattern => Severity::Medium,
            SecurityEventKind::UsernameEnumeration => Severity::Medium,
            SecurityEventKind::SourceCooldownTriggered => Severity::High,
            SecurityEventKind::BruteForceAccount => Severity::High,
            SecurityEventKind::BruteForceSource => Severity::Critical,
        }
    }
}

impl fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityEventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUSPICIOUS_PATTERN" => Ok(SecurityEventKind::SuspiciousPattern),
            "USERNAME_ENUMERATION" => Ok(SecurityEventKind::UsernameEnumeration),
            "SOURCE_COOLDOWN_TRIGGERED" => Ok(SecurityEventKind::SourceCooldownTriggered),
            "BRUTE_FORCE_ACCOUNT" => Ok(SecurityEventKind::BruteForceAccount),
            "BRUTE_FORCE_SOURCE" => Ok(SecurityEventKind::BruteForceSource),
            other => Err(ValidationError::InvalidField(format!(
                "security event kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(ValidationError::InvalidField(format!("severity: {other}"))),
        }
    }
}

/// A persisted security incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: Uuid,
    pub kind: SecurityEventKind,
    pub severity: Severity,
    pub source_addr: String,
    pub username: Option<String>,
    pub details: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// An incident that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewSecurityEvent {
    pub kind: SecurityEventKind,
    pub severity: Severity,
    pub source_addr: String,
    pub username: Option<String>,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl NewSecurityEvent {
    /// Build an event with the kind's default severity.
    pub fn new(
        kind: SecurityEventKind,
        source_addr: impl Into<String>,
        username: Option<String>,
        details: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            source_addr: source_addr.into(),
            username,
            details: details.into(),
            created_at,
        }
    }
}
