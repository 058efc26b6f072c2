use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::info;
use warden::{AuthConfig, SqliteRepositoryProvider, TokenConfig, Warden};
use warden_axum::{AuthAccount, AuthState, OptionalAuthAccount};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("info,warden_demo_server=debug,warden=debug")
        .init();

    info!("Starting warden demo server");

    // Connect to SQLite; WARDEN_DATABASE_URL selects the store
    let database_url =
        std::env::var("WARDEN_DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    let pool = sqlx::SqlitePool::connect(&database_url).await?;

    // Signing secret, token TTL, and the lockout/cooldown thresholds all come
    // from WARDEN_* environment variables
    let token_config = TokenConfig::from_env()?;
    let auth_config = AuthConfig::from_env()?;

    let repositories = Arc::new(SqliteRepositoryProvider::new(pool));
    let warden = Arc::new(Warden::new(repositories, token_config).with_auth_config(auth_config));

    // Run migrations to set up the database schema
    warden.migrate().await?;
    info!("Database migrations completed");

    // Prune expired attempt rows hourly until shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let maintenance = warden.start_maintenance_task(shutdown_rx);

    // Create auth state for middleware
    let auth_state = AuthState {
        warden: warden.clone(),
    };

    // Create the main application
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/protected", get(protected_handler))
        .route("/optional", get(optional_auth_handler))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            warden_axum::auth_middleware::<SqliteRepositoryProvider>,
        ))
        .nest("/auth", warden_axum::routes(warden.clone()));

    info!("Server starting on http://localhost:3000");
    info!("Available endpoints:");
    info!("  GET  /                    - Index page");
    info!("  GET  /protected           - Protected endpoint (requires bearer token)");
    info!("  GET  /optional            - Optional authentication endpoint");
    info!("  POST /auth/register       - Register new account");
    info!("  POST /auth/login          - Login and receive an access token");
    info!("  GET  /auth/me             - Get current account");
    info!("  GET  /auth/source-status  - Cooldown standing of the caller's address");
    info!("  GET  /auth/health         - Health check");

    // Start the server; connect info is what attributes requests to a source
    // address, so serve with it
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    // Stop the pruning task before exiting
    let _ = shutdown_tx.send(true);
    maintenance.await?;

    Ok(())
}

async fn index_handler() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the warden demo server",
        "endpoints": {
            "protected": "/protected",
            "optional": "/optional",
            "auth": {
                "register": "POST /auth/register",
                "login": "POST /auth/login",
                "me": "GET /auth/me",
                "source_status": "GET /auth/source-status",
                "health": "GET /auth/health"
            }
        },
        "example_usage": {
            "register": {
                "method": "POST",
                "url": "/auth/register",
                "body": {
                    "username": "gateway-01",
                    "password": "Sensor#Mesh77"
                }
            },
            "login": {
                "method": "POST",
                "url": "/auth/login",
                "body": {
                    "username": "gateway-01",
                    "password": "Sensor#Mesh77"
                }
            },
            "bearer_auth": {
                "method": "GET",
                "url": "/protected",
                "headers": {
                    "Authorization": "Bearer <access_token>"
                }
            }
        }
    }))
}

async fn protected_handler(AuthAccount(account): AuthAccount) -> Json<Value> {
    info!("Protected endpoint accessed by account: {}", account.id);

    Json(json!({
        "message": "This is a protected endpoint - authentication required",
        "account": {
            "id": account.id,
            "username": account.username,
            "created_at": account.created_at
        },
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn optional_auth_handler(OptionalAuthAccount(account): OptionalAuthAccount) -> Json<Value> {
    match account {
        Some(account) => {
            info!(
                "Optional auth endpoint accessed by authenticated account: {}",
                account.id
            );
            Json(json!({
                "message": "This endpoint supports optional authentication",
                "authenticated": true,
                "account": {
                    "id": account.id,
                    "username": account.username,
                    "created_at": account.created_at
                },
                "timestamp": chrono::Utc::now().to_rfc3339()
            }))
        }
        None => Json(json!({
            "message": "This endpoint supports optional authentication",
            "authenticated": false,
            "account": null,
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    }
}
