//! # Warden Axum Integration
//!
//! This crate provides Axum routes and middleware for the warden
//! authentication backend. It exposes login, registration, and status
//! endpoints as a ready-made router that can be nested into any Axum
//! application.
//!
//! ## Endpoints
//!
//! - `POST /login` - Password login returning a bearer access token
//! - `POST /register` - Account registration
//! - `GET /me` - Current account for a bearer token
//! - `GET /source-status` - Cooldown standing of the caller's source address
//! - `GET /health` - Storage round-trip health check
//!
//! Blocked logins answer `429` with a `Retry-After` header. Wrong-password
//! and unknown-username logins share one `401` body, so callers cannot probe
//! which usernames exist.
//!
//! The source address is taken from the connection, which means the listener
//! must be served with connect info (see the example below). Without it every
//! request is treated as coming from an unattributable source, which is never
//! placed in cooldown.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//!
//! use axum::Router;
//! use warden::{SqliteRepositoryProvider, TokenConfig, Warden};
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = sqlx::SqlitePool::connect("sqlite://warden.db").await.unwrap();
//!     let repositories = Arc::new(SqliteRepositoryProvider::new(pool));
//!     let token_config = TokenConfig::new_hs256(b"a-secret-of-at-least-32-bytes!!!".to_vec());
//!
//!     let warden = Arc::new(Warden::new(repositories, token_config));
//!     warden.migrate().await.unwrap();
//!
//!     let app = Router::new().nest("/auth", warden_axum::routes(warden));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(
//!         listener,
//!         app.into_make_service_with_connect_info::<SocketAddr>(),
//!     )
//!     .await
//!     .unwrap();
//! }
//! ```

mod error;
mod extractors;
mod middleware;
mod routes;
mod types;

pub use error::{AuthError, Result};
pub use extractors::{AuthAccount, BearerToken, OptionalAuthAccount};
pub use middleware::{AuthState, auth_middleware, require_auth};
pub use routes::create_router;
pub use types::{
    AccountResponse, ConnectionInfo, HealthResponse, LoginRequest, LoginResponse, RegisterRequest,
    SourceStatusResponse,
};

use axum::Router;
use std::sync::Arc;
use warden::{RepositoryProvider, Warden};

/// Create authentication routes for your Axum application.
///
/// # Arguments
///
/// * `warden` - An Arc-wrapped Warden instance configured with your storage backend
///
/// # Returns
///
/// A Router that can be nested into your application at any path (e.g., "/auth")
///
/// # Example
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use warden::{SqliteRepositoryProvider, Warden};
/// # fn build(warden: Arc<Warden<SqliteRepositoryProvider>>) -> axum::Router {
/// axum::Router::new().nest("/auth", warden_axum::routes(warden))
/// # }
/// ```
pub fn routes<R>(warden: Arc<Warden<R>>) -> Router
where
    R: RepositoryProvider + 'static,
{
    create_router(warden)
}
