//! Service layer.
//!
//! Services own the business rules and talk to storage through the
//! repository traits, so every backend gets the same behavior:
//!
//! - [`AuthService`]: the login decision itself
//! - [`AccountService`]: registration and operator actions on accounts
//! - [`ProtectionService`]: source cooldowns, heuristics, and the
//!   security event feed

pub mod account;
pub mod auth;
pub mod protection;

pub use account::AccountService;
pub use auth::{AuthService, AuthSuccess};
pub use protection::{FollowUp, ProtectionService};
