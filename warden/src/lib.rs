//! # Warden
//!
//! Warden is a self-hosted authentication backend for device fleets that keeps
//! you in control of your credential data. Unlike hosted identity providers,
//! Warden stores accounts wherever you choose and layers brute-force defense
//! over every login decision.
//!
//! With Warden, you get:
//! - Password-based authentication with JWT access tokens
//! - Per-account lockout after repeated failed passwords
//! - Per-source cooldown driven by an append-only attempt ledger
//! - A security event feed for operator review
//!
//! ## Storage Support
//!
//! Warden currently supports the following storage backends:
//! - SQLite
//!
//! ## Example
//!
//! ```rust,no_run
//! use warden::{TokenConfig, Warden};
//! use warden_storage_sqlite::SqliteRepositoryProvider;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
//!     let repositories = Arc::new(SqliteRepositoryProvider::new(pool));
//!
//!     let token_config = TokenConfig::new_hs256(b"a-secret-of-at-least-32-bytes!!!".to_vec());
//!     let warden = Warden::new(repositories, token_config);
//! }
//! ```
use std::sync::Arc;

use warden_core::{
    SystemClock, TokenIssuer,
    error::Error,
    repositories::{
        AccountRepositoryAdapter, AttemptRepositoryAdapter, EventRepositoryAdapter,
    },
    services::{AccountService, AuthService, ProtectionService},
};

/// Re-export core types from warden_core
///
/// These types are commonly used when working with the Warden API.
pub use warden_core::{
    AccessToken, Account, AccountId, AuthConfig, AuthSuccess, Clock, FailureReason,
    FixedClock, RepositoryProvider, SecurityEvent, SecurityEventKind, Severity, SourceStatus,
    TokenConfig,
};
pub use warden_core::error::BlockedError;

/// Re-export storage backends
///
/// These storage implementations are available when the corresponding feature is enabled.
#[cfg(feature = "sqlite")]
pub use warden_storage_sqlite::SqliteRepositoryProvider;

/// Errors that can occur when using Warden.
///
/// Refusals with a time component keep their structure so transport layers
/// can surface a retry hint; everything else is flattened to a message.
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    /// Error during authentication
    #[error("Auth error: {0}")]
    AuthError(String),
    /// Request refused by a lockout or cooldown
    #[error(transparent)]
    Blocked(#[from] BlockedError),
    /// Error when interacting with storage
    #[error("Storage error: {0}")]
    StorageError(String),
    /// Error validating request input
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Error issuing or verifying an access token
    #[error("Token error: {0}")]
    TokenError(String),
}

impl WardenError {
    /// Seconds until a blocked request may be retried, when applicable.
    pub fn retry_after_secs(&self) -> Option<i64> {
        match self {
            WardenError::Blocked(blocked) => Some(blocked.retry_after_secs()),
            _ => None,
        }
    }
}

impl From<Error> for WardenError {
    fn from(e: Error) -> Self {
        match e {
            Error::Auth(e) => WardenError::AuthError(e.to_string()),
            Error::Blocked(e) => WardenError::Blocked(e),
            Error::Storage(e) => WardenError::StorageError(e.to_string()),
            Error::Validation(e) => WardenError::ValidationError(e.to_string()),
            Error::Token(e) => WardenError::TokenError(e.to_string()),
        }
    }
}

/// The main coordinator that wires services to a storage backend.
///
/// `Warden` acts as the central point for configuring and managing
/// authentication in your application. It builds the account, protection, and
/// auth services over a repository provider and exposes their operations
/// behind one API.
///
/// # Example
///
/// ```rust,no_run
/// use warden::{TokenConfig, Warden};
/// use warden_storage_sqlite::SqliteRepositoryProvider;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = sqlx::SqlitePool::connect("sqlite::memory:").await?;
///     let repositories = Arc::new(SqliteRepositoryProvider::new(pool));
///
///     let token_config = TokenConfig::new_hs256(b"a-secret-of-at-least-32-bytes!!!".to_vec());
///     let warden = Warden::new(repositories, token_config);
///     warden.migrate().await?;
///
///     let account = warden.register_account("gateway-01", "Str0ng&Secret77").await?;
///     println!("Account: {:?}", account);
///
///     Ok(())
/// }
/// ```
pub struct Warden<R: RepositoryProvider> {
    repositories: Arc<R>,
    config: AuthConfig,
    token_config: TokenConfig,
    clock: Arc<dyn Clock>,

    account_service: Arc<AccountService<AccountRepositoryAdapter<R>>>,
    protection_service:
        Arc<ProtectionService<AttemptRepositoryAdapter<R>, EventRepositoryAdapter<R>>>,
    auth_service: Arc<
        AuthService<
            AccountRepositoryAdapter<R>,
            AttemptRepositoryAdapter<R>,
            EventRepositoryAdapter<R>,
        >,
    >,
}

impl<R: RepositoryProvider> Warden<R> {
    /// Create a new Warden instance with a repository provider
    ///
    /// Protection settings default to [`AuthConfig::default`] and timestamps
    /// come from the system clock. There is no default token secret; signing
    /// key material must always be supplied.
    ///
    /// # Arguments
    ///
    /// * `repositories` - The repository provider implementation
    /// * `token_config` - Signing configuration for issued access tokens
    ///
    /// # Returns
    ///
    /// A new Warden instance with all services configured
    pub fn new(repositories: Arc<R>, token_config: TokenConfig) -> Self {
        Self::with_settings(
            repositories,
            AuthConfig::default(),
            token_config,
            Arc::new(SystemClock),
        )
    }

    /// Create a Warden instance with explicit settings
    ///
    /// # Arguments
    ///
    /// * `repositories` - The repository provider implementation
    /// * `config` - Lockout and cooldown settings
    /// * `token_config` - Signing configuration for issued access tokens
    /// * `clock` - Clock the services read timestamps from
    pub fn with_settings(
        repositories: Arc<R>,
        config: AuthConfig,
        token_config: TokenConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // Create repository adapters
        let accounts = Arc::new(AccountRepositoryAdapter::new(repositories.clone()));
        let attempts = Arc::new(AttemptRepositoryAdapter::new(repositories.clone()));
        let events = Arc::new(EventRepositoryAdapter::new(repositories.clone()));

        let account_service = Arc::new(AccountService::new(accounts.clone(), clock.clone()));
        let protection_service = Arc::new(ProtectionService::new(
            attempts,
            events,
            config.clone(),
            clock.clone(),
        ));
        let auth_service = Arc::new(AuthService::new(
            accounts,
            protection_service.clone(),
            Arc::new(TokenIssuer::new(token_config.clone())),
            clock.clone(),
        ));

        Self {
            repositories,
            config,
            token_config,
            clock,
            account_service,
            protection_service,
            auth_service,
        }
    }

    /// Set the protection configuration
    ///
    /// This method allows customization of lockout thresholds, cooldown
    /// windows, and ledger retention. Services are rebuilt against the new
    /// settings.
    ///
    /// # Arguments
    ///
    /// * `config` - The protection configuration to use
    pub fn with_auth_config(self, config: AuthConfig) -> Self {
        Self::with_settings(self.repositories, config, self.token_config, self.clock)
    }

    /// Replace the clock the services read timestamps from
    ///
    /// Intended for tests that need to step time across lockout and cooldown
    /// windows.
    ///
    /// # Arguments
    ///
    /// * `clock` - The clock to use
    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self::with_settings(self.repositories, self.config, self.token_config, clock)
    }

    /// Get the active protection configuration
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Run migrations for all repositories
    pub async fn migrate(&self) -> Result<(), WardenError> {
        self.repositories
            .migrate()
            .await
            .map_err(|e| WardenError::StorageError(e.to_string()))
    }

    /// Health check for all repositories
    pub async fn health_check(&self) -> Result<(), WardenError> {
        self.repositories
            .health_check()
            .await
            .map_err(|e| WardenError::StorageError(e.to_string()))
    }

    /// Register a new account
    ///
    /// The username is normalized to lowercase before storage, so lookups and
    /// logins are case-insensitive.
    ///
    /// # Arguments
    ///
    /// * `username` - The username of the account to register
    /// * `password` - The password of the account to register
    ///
    /// # Returns
    ///
    /// Returns the registered account
    pub async fn register_account(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Account, WardenError> {
        self.account_service
            .register(username, password)
            .await
            .map_err(WardenError::from)
    }

    /// Authenticate a login request
    ///
    /// Runs the full protection pipeline: the source cooldown check, the
    /// account lockout check, and password verification, in that order. On
    /// success a signed access token is issued.
    ///
    /// Unknown usernames and wrong passwords both surface as the same
    /// [`WardenError::AuthError`]; callers must not leak which one it was.
    /// Active cooldowns and lockouts surface as [`WardenError::Blocked`] with
    /// the seconds until the block lifts.
    ///
    /// # Arguments
    ///
    /// * `username` - The username presented by the client
    /// * `password` - The password presented by the client
    /// * `source_addr` - The network address the request arrived from
    /// * `user_agent` - Optional client agent string, used by heuristics
    ///
    /// # Returns
    ///
    /// Returns the account and a freshly issued token on success
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        source_addr: &str,
        user_agent: Option<&str>,
    ) -> Result<AuthSuccess, WardenError> {
        self.auth_service
            .authenticate(username, password, source_addr, user_agent)
            .await
            .map_err(WardenError::from)
    }

    /// Resolve a bearer token to the account it was issued for
    ///
    /// # Arguments
    ///
    /// * `token` - The access token presented by the client
    ///
    /// # Returns
    ///
    /// Returns the account if the token is valid and the account still exists
    pub async fn current_account(&self, token: &str) -> Result<Account, WardenError> {
        self.auth_service
            .current_account(token)
            .await
            .map_err(WardenError::from)
    }

    /// Get an account by its ID
    ///
    /// # Arguments
    ///
    /// * `account_id` - The ID of the account to retrieve
    ///
    /// # Returns
    ///
    /// Returns the account if found, otherwise `None`
    pub async fn get_account(&self, account_id: &AccountId) -> Result<Option<Account>, WardenError> {
        self.account_service
            .get_by_id(account_id)
            .await
            .map_err(WardenError::from)
    }

    /// Get an account by its username
    ///
    /// # Arguments
    ///
    /// * `username` - The username of the account to retrieve
    ///
    /// # Returns
    ///
    /// Returns the account if found, otherwise `None`
    pub async fn get_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, WardenError> {
        self.account_service
            .get_by_username(username)
            .await
            .map_err(WardenError::from)
    }

    /// Clear an account's lockout ahead of its expiry
    ///
    /// The failure counter is reset regardless of the account's previous
    /// state.
    ///
    /// # Arguments
    ///
    /// * `username` - The username of the account to unlock
    ///
    /// # Returns
    ///
    /// Returns `true` if the account was locked at the time of the call
    pub async fn unlock_account(&self, username: &str) -> Result<bool, WardenError> {
        self.account_service
            .unlock(username)
            .await
            .map_err(WardenError::from)
    }

    /// Get the current cooldown status for a source address
    ///
    /// # Arguments
    ///
    /// * `source_addr` - The source address to inspect
    pub async fn source_status(&self, source_addr: &str) -> Result<SourceStatus, WardenError> {
        self.protection_service
            .source_status(source_addr)
            .await
            .map_err(WardenError::from)
    }

    /// Get the most recent security events, newest first
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of events to return
    pub async fn recent_events(&self, limit: u32) -> Result<Vec<SecurityEvent>, WardenError> {
        self.protection_service
            .recent_events(limit)
            .await
            .map_err(WardenError::from)
    }

    /// Mark a security event as reviewed
    ///
    /// # Arguments
    ///
    /// * `event_id` - The ID of the event to resolve
    ///
    /// # Returns
    ///
    /// Returns `true` if the event existed and was marked resolved
    pub async fn resolve_event(&self, event_id: &uuid::Uuid) -> Result<bool, WardenError> {
        self.protection_service
            .resolve_event(event_id)
            .await
            .map_err(WardenError::from)
    }

    /// Delete ledger rows older than the retention horizon
    ///
    /// # Returns
    ///
    /// Returns the number of rows deleted
    pub async fn prune_expired_attempts(&self) -> Result<u64, WardenError> {
        self.protection_service
            .prune_expired()
            .await
            .map_err(WardenError::from)
    }

    /// Start the background maintenance task
    ///
    /// Spawns a task that periodically prunes expired ledger rows until the
    /// shutdown signal fires.
    ///
    /// # Arguments
    ///
    /// * `shutdown` - A watch receiver that signals when to stop the task
    ///
    /// # Returns
    ///
    /// A `JoinHandle` for the spawned task
    pub fn start_maintenance_task(
        &self,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        self.protection_service.start_maintenance_task(shutdown)
    }
}
