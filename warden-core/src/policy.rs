//! Cooldown and lockout decisions
//!
//! The policy is a pure function of ledger statistics, account state, and an
//! explicit "now". All I/O stays in the services; the window arithmetic and
//! threshold comparisons live here so they can be tested against fixed
//! instants.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    account::Account,
    attempt::{AttemptStats, FailureReason},
    config::AuthConfig,
};

/// Placeholder address for requests whose network origin could not be
/// determined. Recorded in the ledger but never blocked.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Agent strings shorter than this are treated as a suspicion indicator.
const MIN_AGENT_LENGTH: usize = 10;

/// Agent substrings that mark automated clients.
const BOT_AGENT_MARKERS: &[&str] = &["bot", "crawler", "spider", "scraper"];

/// Unknown-username hits against one username within [`enumeration_window`]
/// before a `USERNAME_ENUMERATION` event fires.
///
/// [`enumeration_window`]: CooldownPolicy::enumeration_window
pub const ENUMERATION_THRESHOLD: u32 = 3;

/// Block decision for a source address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub is_blocked: bool,
    pub remaining_seconds: i64,
    pub failed_attempts: u32,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl SourceStatus {
    /// Status for an address with nothing held against it.
    pub fn clear() -> Self {
        Self {
            is_blocked: false,
            remaining_seconds: 0,
            failed_attempts: 0,
            cooldown_until: None,
        }
    }
}

/// Account lockout classification at a given instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccountLockState {
    /// No lockout in effect.
    Active { failed_count: u32 },
    /// Lockout expiry is in the future; the attempt must be refused.
    Locked {
        until: DateTime<Utc>,
        remaining_seconds: i64,
    },
    /// A lockout was set but its expiry has passed. The caller resets the
    /// account to active before processing the attempt.
    LockoutExpired,
}

/// Pure decision component for both defense tracks.
///
/// Holds only configuration. Callers supply the ledger statistics, the
/// account row, and the single clock reading their request took.
#[derive(Debug, Clone)]
pub struct CooldownPolicy {
    config: AuthConfig,
}

impl CooldownPolicy {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Start of the trailing source window ending at `now`.
    pub fn source_window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.config.source_window
    }

    /// Start of the one-hour window used by the suspicion heuristics and the
    /// enumeration tally.
    pub fn hourly_window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.enumeration_window()
    }

    pub fn enumeration_window(&self) -> Duration {
        Duration::hours(1)
    }

    /// Decide whether a source address is blocked given its in-window stats.
    ///
    /// An address with zero recorded attempts is never blocked, and neither
    /// is an unattributable one. Expiry is lazy: a tally at the threshold
    /// whose latest entry has aged past the window is already clear.
    pub fn source_status(
        &self,
        source_addr: &str,
        stats: &AttemptStats,
        now: DateTime<Utc>,
    ) -> SourceStatus {
        if source_addr.is_empty() || source_addr == UNKNOWN_SOURCE {
            return SourceStatus::clear();
        }

        if stats.count < self.config.max_source_attempts {
            return SourceStatus {
                is_blocked: false,
                remaining_seconds: 0,
                failed_attempts: stats.count,
                cooldown_until: None,
            };
        }

        // Block until the most recent qualifying attempt ages out
        let cooldown_until = stats.latest_at.map(|t| t + self.config.source_window);
        let is_blocked = cooldown_until.is_some_and(|until| until > now);

        SourceStatus {
            is_blocked,
            remaining_seconds: if is_blocked {
                cooldown_until.map(|until| (until - now).num_seconds()).unwrap_or(0)
            } else {
                0
            },
            failed_attempts: stats.count,
            cooldown_until: if is_blocked { cooldown_until } else { None },
        }
    }

    /// Classify an account's lockout state against `now`.
    pub fn account_state(&self, account: &Account, now: DateTime<Utc>) -> AccountLockState {
        match account.locked_until {
            Some(until) if until > now => AccountLockState::Locked {
                until,
                remaining_seconds: (until - now).num_seconds(),
            },
            Some(_) => AccountLockState::LockoutExpired,
            None => AccountLockState::Active {
                failed_count: account.failed_count,
            },
        }
    }

    /// Lockout expiry for an account that crosses the threshold at `now`.
    pub fn lockout_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.config.account_lockout_window
    }

    /// True when `tally` is exactly the first crossing of the source
    /// threshold. Only one of any set of concurrent appends observes the
    /// exact value, so the triggered event fires once per episode.
    pub fn source_threshold_crossed(&self, tally: u32) -> bool {
        tally == self.config.max_source_attempts
    }

    /// True when a blocked source has kept hammering to twice the threshold.
    pub fn source_overrun(&self, tally: u32) -> bool {
        tally == self.config.max_source_attempts * 2
    }

    /// True when `tally` unknown-username hits is exactly the enumeration
    /// threshold.
    pub fn enumeration_crossed(&self, tally: u32) -> bool {
        tally == ENUMERATION_THRESHOLD
    }

    /// Agent-string suspicion indicator, if any.
    ///
    /// The hourly-rate part of the heuristic needs ledger I/O and lives in
    /// the protection service; this covers only what the agent string itself
    /// reveals.
    pub fn agent_indicator(&self, user_agent: Option<&str>) -> Option<&'static str> {
        match user_agent {
            None => Some("missing agent string"),
            Some(agent) if agent.chars().count() < MIN_AGENT_LENGTH => {
                Some("short agent string")
            }
            Some(agent) => {
                let lowered = agent.to_lowercase();
                if BOT_AGENT_MARKERS.iter().any(|marker| lowered.contains(marker)) {
                    Some("bot-like agent string")
                } else {
                    None
                }
            }
        }
    }

    /// Whether a single ledger entry should carry the suspicious flag.
    ///
    /// Flags attempts with dubious agent strings, plus the reasons that most
    /// often accompany probing: unknown usernames and already-blocked
    /// sources.
    pub fn attempt_is_suspicious(
        &self,
        user_agent: Option<&str>,
        reason: FailureReason,
    ) -> bool {
        if self.agent_indicator(user_agent).is_some() {
            return true;
        }
        matches!(
            reason,
            FailureReason::UnknownUsername | FailureReason::SourceBlocked
        )
    }
}
