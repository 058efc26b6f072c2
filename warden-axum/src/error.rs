use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use warden::{BlockedError, WardenError};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Source address in cooldown, retry in {retry_after_secs}s")]
    SourceCooldown { retry_after_secs: i64 },

    #[error("Account locked, retry in {retry_after_secs}s")]
    AccountLocked { retry_after_secs: i64 },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Unauthorized")]
    Unauthorized,
}

impl From<WardenError> for AuthError {
    fn from(err: WardenError) -> Self {
        match err {
            WardenError::AuthError(msg) => {
                if msg.contains("already taken") {
                    AuthError::UsernameTaken
                } else if msg.contains("not found") {
                    // A token whose subject no longer exists is indistinguishable
                    // from a stale token as far as the caller is concerned.
                    AuthError::InvalidToken
                } else {
                    AuthError::InvalidCredentials
                }
            }
            WardenError::Blocked(BlockedError::SourceCooldown { retry_after_secs }) => {
                AuthError::SourceCooldown { retry_after_secs }
            }
            WardenError::Blocked(BlockedError::AccountLocked { retry_after_secs }) => {
                AuthError::AccountLocked { retry_after_secs }
            }
            WardenError::ValidationError(msg) => AuthError::BadRequest(msg),
            WardenError::TokenError(_) => AuthError::InvalidToken,
            WardenError::StorageError(msg) => AuthError::InternalError(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Failed and unknown-user logins must produce the same body, so both
        // collapse onto InvalidCredentials before rendering happens here.
        let (status, retry_after, detail) = match self {
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                None,
                "invalid username or password".to_string(),
            ),
            AuthError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, None, "invalid token".to_string())
            }
            AuthError::UsernameTaken => (
                StatusCode::BAD_REQUEST,
                None,
                "username already taken".to_string(),
            ),
            AuthError::SourceCooldown { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                Some(retry_after_secs),
                format!("source address in cooldown, retry in {retry_after_secs} seconds"),
            ),
            AuthError::AccountLocked { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                Some(retry_after_secs),
                format!("account locked, retry in {retry_after_secs} seconds"),
            ),
            AuthError::BadRequest(msg) => (StatusCode::BAD_REQUEST, None, msg),
            AuthError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, None, msg),
            AuthError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                None,
                "missing bearer token".to_string(),
            ),
        };

        let body = Json(json!({ "detail": detail }));
        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(0) as u64));
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failures_share_one_body() {
        let bad_password = AuthError::from(WardenError::AuthError("Invalid credentials".into()));
        let unknown_user = AuthError::from(WardenError::AuthError("Invalid credentials".into()));
        assert!(matches!(bad_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_duplicate_username_maps_to_taken() {
        let err = AuthError::from(WardenError::AuthError("Username already taken".into()));
        assert!(matches!(err, AuthError::UsernameTaken));
    }

    #[test]
    fn test_blocked_errors_keep_retry_hint() {
        let err = AuthError::from(WardenError::Blocked(BlockedError::SourceCooldown {
            retry_after_secs: 1800,
        }));
        assert!(matches!(
            err,
            AuthError::SourceCooldown {
                retry_after_secs: 1800
            }
        ));

        let err = AuthError::from(WardenError::Blocked(BlockedError::AccountLocked {
            retry_after_secs: 900,
        }));
        assert!(matches!(
            err,
            AuthError::AccountLocked {
                retry_after_secs: 900
            }
        ));
    }

    #[test]
    fn test_retry_after_header_is_set() {
        let response = AuthError::SourceCooldown {
            retry_after_secs: 1800,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER),
            Some(&HeaderValue::from_static("1800"))
        );

        let response = AuthError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }

    #[test]
    fn test_token_errors_are_unauthorized() {
        let err = AuthError::from(WardenError::TokenError("Token expired".into()));
        assert!(matches!(err, AuthError::InvalidToken));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
