//! Account records and lockout state
//!
//! Accounts are the unit of per-account brute-force defense. The core only
//! reads and mutates the fields relevant to lockout; everything else about a
//! fleet user lives outside this crate.
//!
//! | Field           | Type               | Description                                         |
//! | --------------- | ------------------ | --------------------------------------------------- |
//! | `id`            | `AccountId`        | The unique identifier for the account.              |
//! | `username`      | `String`           | Lowercased unique username.                         |
//! | `password_hash` | `String`           | Password hash. Never serialized.                    |
//! | `failed_count`  | `u32`              | Consecutive failed attempts since the last reset.   |
//! | `locked_until`  | `Option<DateTime>` | Lockout expiry. `None` when the account is active.  |
//! | `created_at`    | `DateTime`         | The timestamp when the account was created.         |
//! | `updated_at`    | `DateTime`         | The timestamp when the account was last updated.    |

use crate::{
    Error,
    error::utilities::RequiredFieldExt,
    id::{generate_prefixed_id, validate_prefixed_id},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A unique, stable identifier for a specific account
/// This value should be treated as opaque, and should not be used as a UUID even if it may look like one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: &str) -> Self {
        AccountId(id.to_string())
    }

    pub fn new_random() -> Self {
        AccountId(generate_prefixed_id("acct"))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this ID has the correct format for an account ID
    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "acct")
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored account with its lockout bookkeeping.
///
/// `failed_count` is zeroed exactly when authentication succeeds or when
/// `locked_until` is set, so a locked account always carries a zero counter
/// and the lockout state lives entirely in `locked_until`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,

    pub username: String,

    // Skipped on serialize so the hash cannot leak through response bodies
    // or structured logs.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub failed_count: u32,

    pub locked_until: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn builder() -> AccountBuilder {
        AccountBuilder::default()
    }

    /// Check whether the lockout expiry is set and still in the future.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Time left on an active lockout, `None` when the account is not locked.
    pub fn lockout_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.locked_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }
}

/// An account that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: AccountId,
    pub username: String,
    pub password_hash: String,
}

#[derive(Default)]
pub struct AccountBuilder {
    id: Option<AccountId>,
    username: Option<String>,
    password_hash: Option<String>,
    failed_count: u32,
    locked_until: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl AccountBuilder {
    pub fn id(mut self, id: AccountId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    pub fn password_hash(mut self, password_hash: String) -> Self {
        self.password_hash = Some(password_hash);
        self
    }

    pub fn failed_count(mut self, failed_count: u32) -> Self {
        self.failed_count = failed_count;
        self
    }

    pub fn locked_until(mut self, locked_until: Option<DateTime<Utc>>) -> Self {
        self.locked_until = locked_until;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    pub fn build(self) -> Result<Account, Error> {
        let now = Utc::now();
        Ok(Account {
            id: self.id.unwrap_or_default(),
            username: self.username.require_field("Username")?,
            password_hash: self.password_hash.require_field("Password hash")?,
            failed_count: self.failed_count,
            locked_until: self.locked_until,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        })
    }
}
