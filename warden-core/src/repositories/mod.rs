//! Repository traits for data access layer
//!
//! This module defines the repository interfaces that services use to interact with storage.
//! These traits provide a clean abstraction over the underlying storage implementation.
//!
//! # Trait Hierarchy
//!
//! The repository system uses a composable trait hierarchy:
//!
//! - Individual `*Repository` traits define the operations for each data domain
//! - Individual `*RepositoryProvider` traits provide access to each repository type
//! - [`RepositoryProvider`] is a supertrait combining all provider traits plus lifecycle methods
//!
//! This design allows storage backends to:
//! - Implement only the repositories they need
//! - Provide a unified interface through the full `RepositoryProvider` trait
//! - Share repository implementations across different backend types

pub mod account;
pub mod adapter;
pub mod attempt;
pub mod event;

pub use account::{AccountRepository, PasswordFailure};
pub use adapter::{AccountRepositoryAdapter, AttemptRepositoryAdapter, EventRepositoryAdapter};
pub use attempt::AttemptRepository;
pub use event::EventRepository;

use async_trait::async_trait;

use crate::Error;

// ============================================================================
// Individual Repository Provider Traits
// ============================================================================

/// Provider trait for account repository access.
///
/// Implement this trait to provide account management functionality.
pub trait AccountRepositoryProvider: Send + Sync + 'static {
    /// The account repository implementation type
    type AccountRepo: AccountRepository;

    /// Get the account repository
    fn account(&self) -> &Self::AccountRepo;
}

/// Provider trait for attempt ledger repository access.
///
/// Implement this trait to provide failed attempt tracking functionality.
pub trait AttemptRepositoryProvider: Send + Sync + 'static {
    /// The attempt repository implementation type
    type AttemptRepo: AttemptRepository;

    /// Get the attempt repository
    fn attempt(&self) -> &Self::AttemptRepo;
}

/// Provider trait for security event repository access.
///
/// Implement this trait to provide security event recording functionality.
pub trait EventRepositoryProvider: Send + Sync + 'static {
    /// The event repository implementation type
    type EventRepo: EventRepository;

    /// Get the event repository
    fn event(&self) -> &Self::EventRepo;
}

// ============================================================================
// Unified Repository Provider Trait
// ============================================================================

/// Provider trait that storage implementations must implement to provide all repositories.
///
/// This trait is a supertrait combining all individual repository provider traits,
/// plus lifecycle methods for migrations and health checks.
///
/// # Implementing a Custom Storage Backend
///
/// To implement a custom storage backend, you need to:
/// 1. Implement each individual `*Repository` trait for your backend
/// 2. Implement each individual `*RepositoryProvider` trait
/// 3. Implement the `RepositoryProvider` trait with `migrate()` and `health_check()`
#[async_trait]
pub trait RepositoryProvider:
    AccountRepositoryProvider + AttemptRepositoryProvider + EventRepositoryProvider
{
    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
