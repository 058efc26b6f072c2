//! SQLite storage backend for the warden authentication ecosystem
//!
//! Implements the warden-core repository traits on top of a [`sqlx`] SQLite
//! pool. All timestamps are stored as unix seconds in INTEGER columns.
//!
//! The entry point is [`SqliteRepositoryProvider`]:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_core::repositories::RepositoryProvider;
//! use warden_storage_sqlite::SqliteRepositoryProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = sqlx::SqlitePool::connect("sqlite::memory:").await?;
//!     let repositories = Arc::new(SqliteRepositoryProvider::new(pool));
//!     repositories.migrate().await?;
//!     Ok(())
//! }
//! ```

pub mod migrations;
pub mod repositories;

pub use repositories::{
    SqliteAccountRepository, SqliteAttemptRepository, SqliteEventRepository,
    SqliteRepositoryProvider,
};
