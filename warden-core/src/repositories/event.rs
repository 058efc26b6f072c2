use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    Error,
    event::{NewSecurityEvent, SecurityEvent},
};

/// Repository for security event data access
#[async_trait]
pub trait EventRepository: Send + Sync + 'static {
    /// Record a new security event
    async fn record(&self, event: &NewSecurityEvent) -> Result<SecurityEvent, Error>;

    /// Get the most recent events, newest first
    async fn recent(&self, limit: u32) -> Result<Vec<SecurityEvent>, Error>;

    /// Mark an event as resolved.
    ///
    /// Returns `true` if the event existed and was updated.
    async fn resolve(&self, id: &Uuid) -> Result<bool, Error>;
}
