use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    account::{Account, AccountId, NewAccount},
    attempt::{FailedAttempt, NewFailedAttempt},
};

/// Result of recording a failed password attempt against an account.
///
/// Carries the account row as it looks after the counter update together
/// with the ledger entry that was appended for the attempt.
#[derive(Debug, Clone)]
pub struct PasswordFailure {
    /// The account after the counter update was applied
    pub account: Account,
    /// The appended failed attempt record
    pub attempt: FailedAttempt,
}

/// Repository for account data access
#[async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    /// Create a new account
    async fn create(&self, account: NewAccount) -> Result<Account, Error>;

    /// Find an account by ID
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error>;

    /// Find an account by its normalized username
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, Error>;

    /// Record a failed password attempt atomically.
    ///
    /// Appends the attempt to the ledger and updates the account's failure
    /// counter in a single transaction. The counter update must be one
    /// conditional statement: when the incremented count reaches
    /// `lock_threshold` the counter resets to zero and `locked_until` is set
    /// to `lock_until`, otherwise the counter increments and any existing
    /// `locked_until` is left untouched.
    ///
    /// A concurrent caller that loses the race therefore observes either the
    /// pre-lock counter or the post-lock reset, never a torn state, and the
    /// returned account is the row as this caller's update left it.
    async fn record_failed_password(
        &self,
        id: &AccountId,
        attempt: &NewFailedAttempt,
        lock_threshold: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<PasswordFailure, Error>;

    /// Reset the failure counter and clear any lockout for an account.
    ///
    /// Called on successful login and on administrative unlock. Returns the
    /// account as it looks after the reset.
    async fn reset_lockout(&self, id: &AccountId) -> Result<Account, Error>;
}
