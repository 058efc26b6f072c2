use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    Error,
    account::{Account, AccountId, NewAccount},
    attempt::{AttemptStats, FailureReason, FailedAttempt, NewFailedAttempt},
    event::{NewSecurityEvent, SecurityEvent},
    repositories::{
        AccountRepository, AttemptRepository, EventRepository, PasswordFailure, RepositoryProvider,
    },
};

/// Adapter that wraps a RepositoryProvider and implements AccountRepository
pub struct AccountRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AccountRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AccountRepository for AccountRepositoryAdapter<R> {
    async fn create(&self, account: NewAccount) -> Result<Account, Error> {
        self.provider.account().create(account).await
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        self.provider.account().find_by_id(id).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
        self.provider.account().find_by_username(username).await
    }

    async fn record_failed_password(
        &self,
        id: &AccountId,
        attempt: &NewFailedAttempt,
        lock_threshold: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<PasswordFailure, Error> {
        self.provider
            .account()
            .record_failed_password(id, attempt, lock_threshold, lock_until)
            .await
    }

    async fn reset_lockout(&self, id: &AccountId) -> Result<Account, Error> {
        self.provider.account().reset_lockout(id).await
    }
}

/// Adapter that wraps a RepositoryProvider and implements AttemptRepository
pub struct AttemptRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AttemptRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AttemptRepository for AttemptRepositoryAdapter<R> {
    async fn record(&self, attempt: &NewFailedAttempt) -> Result<FailedAttempt, Error> {
        self.provider.attempt().record(attempt).await
    }

    async fn source_stats(
        &self,
        source_addr: &str,
        since: DateTime<Utc>,
    ) -> Result<AttemptStats, Error> {
        self.provider.attempt().source_stats(source_addr, since).await
    }

    async fn count_by_username(
        &self,
        username: &str,
        reason: FailureReason,
        since: DateTime<Utc>,
    ) -> Result<u32, Error> {
        self.provider
            .attempt()
            .count_by_username(username, reason, since)
            .await
    }

    async fn clear_source(&self, source_addr: &str) -> Result<u64, Error> {
        self.provider.attempt().clear_source(source_addr).await
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        self.provider.attempt().prune_before(cutoff).await
    }
}

/// Adapter that wraps a RepositoryProvider and implements EventRepository
pub struct EventRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> EventRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> EventRepository for EventRepositoryAdapter<R> {
    async fn record(&self, event: &NewSecurityEvent) -> Result<SecurityEvent, Error> {
        self.provider.event().record(event).await
    }

    async fn recent(&self, limit: u32) -> Result<Vec<SecurityEvent>, Error> {
        self.provider.event().recent(limit).await
    }

    async fn resolve(&self, id: &Uuid) -> Result<bool, Error> {
        self.provider.event().resolve(id).await
    }
}
