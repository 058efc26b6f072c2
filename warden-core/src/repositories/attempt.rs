//! Repository trait for the failed attempt ledger.
//!
//! The ledger is an append-only log of failed login attempts. Source
//! cooldowns are never stored directly; they are derived by counting ledger
//! rows inside a trailing window, so a cooldown expires on its own as rows
//! age out of the window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    attempt::{AttemptStats, FailureReason, FailedAttempt, NewFailedAttempt},
};

/// Repository for the failed attempt ledger.
///
/// # Security Considerations
///
/// - Attempts are recorded for all usernames, including ones that do not
///   exist, so an attacker cannot distinguish the two from timing or from
///   the ledger's behavior.
/// - `prune_before` must never be called with a cutoff inside the source
///   cooldown window; doing so would erase the rows an active cooldown is
///   derived from.
#[async_trait]
pub trait AttemptRepository: Send + Sync + 'static {
    /// Append a failed attempt to the ledger.
    ///
    /// Returns the created record with its assigned ID and timestamp. This
    /// path is used when no account counter needs updating; failures that
    /// also increment an account counter go through
    /// [`AccountRepository::record_failed_password`] instead.
    ///
    /// [`AccountRepository::record_failed_password`]: crate::repositories::AccountRepository::record_failed_password
    async fn record(&self, attempt: &NewFailedAttempt) -> Result<FailedAttempt, Error>;

    /// Get attempt statistics for a source address within a time window.
    ///
    /// Returns the count of failed attempts and the timestamp of the most
    /// recent attempt since the specified cutoff time.
    async fn source_stats(
        &self,
        source_addr: &str,
        since: DateTime<Utc>,
    ) -> Result<AttemptStats, Error>;

    /// Count attempts for a username with a given failure reason since a
    /// cutoff time.
    async fn count_by_username(
        &self,
        username: &str,
        reason: FailureReason,
        since: DateTime<Utc>,
    ) -> Result<u32, Error>;

    /// Delete all attempts recorded for a source address.
    ///
    /// Returns the number of records deleted.
    async fn clear_source(&self, source_addr: &str) -> Result<u64, Error>;

    /// Delete attempts older than the given timestamp.
    ///
    /// Used for periodic retention cleanup. Returns the number of records
    /// deleted.
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error>;
}
