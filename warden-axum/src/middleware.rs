use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use warden::{Account, RepositoryProvider, Warden};

use crate::error::AuthError;

pub struct AuthState<R: RepositoryProvider> {
    pub warden: Arc<Warden<R>>,
}

impl<R: RepositoryProvider> Clone for AuthState<R> {
    fn clone(&self) -> Self {
        Self {
            warden: self.warden.clone(),
        }
    }
}

/// Resolves the bearer token, if any, and stashes the account in request
/// extensions. Requests without a valid token pass through unauthenticated.
pub async fn auth_middleware<R>(
    State(state): State<AuthState<R>>,
    mut request: Request,
    next: Next,
) -> Response
where
    R: RepositoryProvider,
{
    request.extensions_mut().insert(None::<Account>);

    if let Some(token) = extract_bearer_token(&request) {
        match state.warden.current_account(&token).await {
            Ok(account) => {
                request.extensions_mut().insert(account.clone());
                request.extensions_mut().insert(Some(account));
            }
            Err(e) => {
                tracing::debug!("Invalid bearer token: {:?}", e);
            }
        }
    }

    next.run(request).await
}

fn extract_bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get("Authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

pub async fn require_auth<R>(
    State(state): State<AuthState<R>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: RepositoryProvider,
{
    let token = extract_bearer_token(&request).ok_or(AuthError::Unauthorized)?;

    let _account = state
        .warden
        .current_account(&token)
        .await
        .map_err(|_| AuthError::InvalidToken)?;

    Ok(next.run(request).await)
}
