use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden::{Account, SourceStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public view of an account. Never carries credential material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id.as_str().to_string(),
            username: account.username,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: AccountResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStatusResponse {
    pub is_blocked: bool,
    pub remaining_time: i64,
    pub failed_attempts: u32,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl From<SourceStatus> for SourceStatusResponse {
    fn from(status: SourceStatus) -> Self {
        Self {
            is_blocked: status.is_blocked,
            remaining_time: status.remaining_seconds,
            failed_attempts: status.failed_attempts,
            cooldown_until: status.cooldown_until,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Where a request came from, as the transport saw it.
///
/// The source address is derived from the connection and never from a
/// client-supplied header; a request whose peer address cannot be determined
/// is treated as unattributable.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub source_addr: String,
    pub user_agent: Option<String>,
}
