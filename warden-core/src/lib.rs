//! Core functionality for the warden project
//!
//! This crate contains the authentication and brute-force defense core:
//! the account, failed-attempt, and security-event structs, the repository
//! traits storage backends implement, and the services that make the actual
//! login decisions.
//!
//! It is designed to be used as a dependency for storage backends and the
//! high-level `warden` crate and is not intended to be used directly by
//! application code.
//!
//! See [`Account`] for the core account struct, [`AuthService`] for the
//! login pipeline, and [`RepositoryProvider`] for the storage contract.
//!
//! Protection semantics live in [`CooldownPolicy`]: account lockouts after
//! repeated password failures and source cooldowns derived from the
//! append-only attempt ledger.

pub mod account;
pub mod attempt;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod id;
pub mod policy;
pub mod repositories;
pub mod services;
pub mod token;
pub mod validation;

pub use account::{Account, AccountId, NewAccount};
pub use attempt::{AttemptStats, FailedAttempt, FailureReason, NewFailedAttempt};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AuthConfig;
pub use error::Error;
pub use event::{NewSecurityEvent, SecurityEvent, SecurityEventKind, Severity};
pub use policy::{AccountLockState, CooldownPolicy, SourceStatus};
pub use repositories::RepositoryProvider;
pub use services::{AccountService, AuthService, AuthSuccess, ProtectionService};
pub use token::{AccessToken, TokenConfig, TokenIssuer};
