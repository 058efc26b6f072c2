use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use warden::{RepositoryProvider, Warden};

use crate::{
    error::{AuthError, Result},
    extractors::BearerToken,
    middleware::{AuthState, auth_middleware},
    types::*,
};

pub fn create_router<R>(warden: Arc<Warden<R>>) -> Router
where
    R: RepositoryProvider + 'static,
{
    let state = AuthState { warden };

    Router::new()
        .route("/login", post(login_handler))
        .route("/register", post(register_handler))
        .route("/me", get(me_handler))
        .route("/source-status", get(source_status_handler))
        .route("/health", get(health_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<R>,
        ))
        .with_state(state)
}

async fn login_handler<R>(
    State(state): State<AuthState<R>>,
    connection_info: ConnectionInfo,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let success = state
        .warden
        .login(
            &payload.username,
            &payload.password,
            &connection_info.source_addr,
            connection_info.user_agent.as_deref(),
        )
        .await?;

    Ok(Json(LoginResponse {
        access_token: success.token.into_inner(),
        token_type: "bearer".to_string(),
        user: success.account.into(),
    }))
}

async fn register_handler<R>(
    State(state): State<AuthState<R>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let account = state
        .warden
        .register_account(&payload.username, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

async fn me_handler<R>(
    State(state): State<AuthState<R>>,
    BearerToken(token): BearerToken,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let token = token.ok_or(AuthError::Unauthorized)?;

    let account = state.warden.current_account(&token).await?;

    Ok(Json(AccountResponse::from(account)))
}

/// Cooldown standing for the source address the request arrived from.
///
/// Only the caller's own address is ever consulted; the address is read from
/// the connection, so one device cannot probe the standing of another.
async fn source_status_handler<R>(
    State(state): State<AuthState<R>>,
    connection_info: ConnectionInfo,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let status = state
        .warden
        .source_status(&connection_info.source_addr)
        .await?;

    Ok(Json(SourceStatusResponse::from(status)))
}

async fn health_handler<R>(State(state): State<AuthState<R>>) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .warden
        .health_check()
        .await
        .map_err(|e| AuthError::InternalError(e.to_string()))?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
