pub mod utilities;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Blocked: {0}")]
    Blocked(#[from] BlockedError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Password hash error: {0}")]
    PasswordHashError(String),
}

/// A request refused because a cooldown or lockout is in effect.
///
/// Both variants carry the number of seconds until the block lifts so the
/// transport layer can surface a retry hint.
#[derive(Debug, Error)]
pub enum BlockedError {
    #[error("Source address is cooling down, retry in {retry_after_secs}s")]
    SourceCooldown { retry_after_secs: i64 },

    #[error("Account is locked, retry in {retry_after_secs}s")]
    AccountLocked { retry_after_secs: i64 },
}

impl BlockedError {
    pub fn retry_after_secs(&self) -> i64 {
        match self {
            BlockedError::SourceCooldown { retry_after_secs }
            | BlockedError::AccountLocked { retry_after_secs } => *retry_after_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Reserved username: {0}")]
    ReservedUsername(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid source address: {0}")]
    InvalidSourceAddress(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl Error {
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Error::Auth(AuthError::InvalidCredentials)
                | Error::Auth(AuthError::AccountNotFound)
                | Error::Auth(AuthError::UsernameTaken)
        )
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Error::Blocked(_))
    }

    /// Seconds until a blocked request may be retried, when applicable.
    pub fn retry_after_secs(&self) -> Option<i64> {
        match self {
            Error::Blocked(blocked) => Some(blocked.retry_after_secs()),
            _ => None,
        }
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_token_error(&self) -> bool {
        matches!(self, Error::Token(_))
    }
}
