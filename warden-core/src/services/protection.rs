//! Brute force protection service over the attempt ledger.
//!
//! Source cooldowns, the advisory heuristics, and security event recording
//! all live here. Account lockout counters are handled by the account
//! repository; this service owns everything derived from the append-only
//! ledger.
//!
//! # Thread Safety
//!
//! This service is thread-safe and can be shared across multiple tasks. The
//! ledger is append-only, so concurrent writers only add rows; a tally read
//! may momentarily miss a row another task just appended, which errs on the
//! side of allowing one more attempt, never on blocking early.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    Error,
    attempt::{FailedAttempt, FailureReason, NewFailedAttempt},
    clock::Clock,
    config::AuthConfig,
    event::{NewSecurityEvent, SecurityEvent},
    policy::{CooldownPolicy, SourceStatus, UNKNOWN_SOURCE},
    repositories::{AttemptRepository, EventRepository},
};

/// Ledger-derived signals computed right after an attempt is appended.
///
/// Threshold crossings compare against the exact post-append tally, so of
/// any set of concurrent appends only one observes the crossing and the
/// corresponding event fires once per episode.
#[derive(Debug, Clone)]
pub struct FollowUp {
    /// Source status including the appended row
    pub source: SourceStatus,
    /// The append was exactly the source cooldown threshold
    pub source_crossed: bool,
    /// The append was exactly twice the source cooldown threshold
    pub source_overrun: bool,
    /// The append was exactly the enumeration threshold for its username
    pub enumeration_crossed: bool,
}

/// Service for source cooldowns, heuristics, and security events.
pub struct ProtectionService<A: AttemptRepository, E: EventRepository> {
    attempts: Arc<A>,
    events: Arc<E>,
    policy: CooldownPolicy,
    clock: Arc<dyn Clock>,
}

impl<A: AttemptRepository, E: EventRepository> ProtectionService<A, E> {
    /// Create a new ProtectionService with the given repositories.
    pub fn new(
        attempts: Arc<A>,
        events: Arc<E>,
        config: AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            attempts,
            events,
            policy: CooldownPolicy::new(config),
            clock,
        }
    }

    /// Get the cooldown policy.
    pub fn policy(&self) -> &CooldownPolicy {
        &self.policy
    }

    /// Get the current configuration.
    pub fn config(&self) -> &AuthConfig {
        self.policy.config()
    }

    /// Get the current cooldown status for a source address.
    pub async fn source_status(&self, source_addr: &str) -> Result<SourceStatus, Error> {
        self.source_status_at(source_addr, self.clock.now()).await
    }

    /// Cooldown status against an explicit clock reading, so a caller that
    /// has already read the clock stays consistent within its request.
    pub(crate) async fn source_status_at(
        &self,
        source_addr: &str,
        now: DateTime<Utc>,
    ) -> Result<SourceStatus, Error> {
        // Unattributable sources never participate in the source track
        if source_addr.is_empty() || source_addr == UNKNOWN_SOURCE {
            return Ok(SourceStatus::clear());
        }

        let stats = self
            .attempts
            .source_stats(source_addr, self.policy.source_window_start(now))
            .await?;

        Ok(self.policy.source_status(source_addr, &stats, now))
    }

    /// Advisory heuristic check for a request.
    ///
    /// Returns the triggering indicator when the request looks automated: a
    /// dubious agent string, or a source already past the secondary hourly
    /// threshold. Never blocks anything on its own.
    pub(crate) async fn suspicion_indicator(
        &self,
        source_addr: &str,
        user_agent: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, Error> {
        if let Some(indicator) = self.policy.agent_indicator(user_agent) {
            return Ok(Some(indicator.to_string()));
        }

        if source_addr.is_empty() || source_addr == UNKNOWN_SOURCE {
            return Ok(None);
        }

        let hourly = self
            .attempts
            .source_stats(source_addr, self.policy.hourly_window_start(now))
            .await?;
        if hourly.count >= self.config().source_hourly_threshold {
            return Ok(Some(format!(
                "{} failed attempts from source in the last hour",
                hourly.count
            )));
        }

        Ok(None)
    }

    /// Append a failed attempt and compute its follow-up signals.
    pub(crate) async fn record_failure(
        &self,
        attempt: &NewFailedAttempt,
    ) -> Result<(FailedAttempt, FollowUp), Error> {
        let recorded = self.attempts.record(attempt).await?;
        let follow = self.followup(&recorded).await?;
        Ok((recorded, follow))
    }

    /// Re-evaluate the source track, and for unknown-username failures the
    /// enumeration track, after `attempt` has been appended.
    pub(crate) async fn followup(&self, attempt: &FailedAttempt) -> Result<FollowUp, Error> {
        let now = attempt.attempted_at;

        let source = self.source_status_at(&attempt.source_addr, now).await?;
        let tally = source.failed_attempts;

        let enumeration_crossed = if attempt.reason == FailureReason::UnknownUsername {
            let since = now - self.policy.enumeration_window();
            let count = self
                .attempts
                .count_by_username(&attempt.username, FailureReason::UnknownUsername, since)
                .await?;
            self.policy.enumeration_crossed(count)
        } else {
            false
        };

        Ok(FollowUp {
            source_crossed: self.policy.source_threshold_crossed(tally),
            source_overrun: self.policy.source_overrun(tally),
            enumeration_crossed,
            source,
        })
    }

    /// Record a security event.
    ///
    /// Event writes are part of the request's contract; a failure here
    /// propagates instead of being swallowed.
    pub async fn emit(&self, event: NewSecurityEvent) -> Result<SecurityEvent, Error> {
        let recorded = self.events.record(&event).await?;

        tracing::warn!(
            kind = %recorded.kind,
            severity = %recorded.severity,
            source_addr = %recorded.source_addr,
            username = recorded.username.as_deref(),
            "Security event recorded"
        );

        Ok(recorded)
    }

    /// Get the most recent security events, newest first.
    pub async fn recent_events(&self, limit: u32) -> Result<Vec<SecurityEvent>, Error> {
        self.events.recent(limit).await
    }

    /// Mark a security event as resolved.
    ///
    /// Returns `true` if the event existed and was updated.
    pub async fn resolve_event(&self, id: &Uuid) -> Result<bool, Error> {
        self.events.resolve(id).await
    }

    /// Delete all ledger rows for a source address.
    pub(crate) async fn clear_source(&self, source_addr: &str) -> Result<u64, Error> {
        if source_addr.is_empty() || source_addr == UNKNOWN_SOURCE {
            return Ok(0);
        }
        self.attempts.clear_source(source_addr).await
    }

    /// Delete ledger rows older than the retention period.
    ///
    /// The cutoff never reaches inside the source cooldown window, since an
    /// active cooldown is derived from those rows.
    pub async fn prune_expired(&self) -> Result<u64, Error> {
        let cutoff = self.clock.now() - self.prune_horizon();
        self.attempts.prune_before(cutoff).await
    }

    fn prune_horizon(&self) -> chrono::Duration {
        std::cmp::max(
            self.config().retention_period,
            self.config().source_window,
        )
    }

    /// Start the background maintenance task.
    ///
    /// This spawns a task that periodically prunes ledger rows past the
    /// retention period.
    ///
    /// # Arguments
    ///
    /// * `shutdown` - A watch receiver that signals when to stop the task
    ///
    /// # Returns
    ///
    /// A `JoinHandle` for the spawned task.
    pub fn start_maintenance_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let attempts = Arc::clone(&self.attempts);
        let clock = Arc::clone(&self.clock);
        let horizon = self.prune_horizon();

        // Maintenance runs hourly
        const MAINTENANCE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(MAINTENANCE_INTERVAL);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let cutoff = clock.now() - horizon;
                        match attempts.prune_before(cutoff).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(
                                    count = count,
                                    "Pruned expired failed attempt records"
                                );
                            }
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    "Failed to prune expired attempt records"
                                );
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down attempt ledger maintenance task");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::event::SecurityEventKind;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;

    struct MockAttemptRepository {
        attempts: Mutex<Vec<FailedAttempt>>,
    }

    impl MockAttemptRepository {
        fn new() -> Self {
            Self {
                attempts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AttemptRepository for MockAttemptRepository {
        async fn record(&self, attempt: &NewFailedAttempt) -> Result<FailedAttempt, Error> {
            let mut attempts = self.attempts.lock().unwrap();
            let recorded = FailedAttempt {
                id: attempts.len() as i64 + 1,
                username: attempt.username.clone(),
                source_addr: attempt.source_addr.clone(),
                user_agent: attempt.user_agent.clone(),
                reason: attempt.reason,
                suspicious: attempt.suspicious,
                attempted_at: attempt.attempted_at,
            };
            attempts.push(recorded.clone());
            Ok(recorded)
        }

        async fn source_stats(
            &self,
            source_addr: &str,
            since: DateTime<Utc>,
        ) -> Result<crate::attempt::AttemptStats, Error> {
            let attempts = self.attempts.lock().unwrap();
            let matching: Vec<_> = attempts
                .iter()
                .filter(|a| a.source_addr == source_addr && a.attempted_at >= since)
                .collect();
            Ok(crate::attempt::AttemptStats {
                count: matching.len() as u32,
                latest_at: matching.iter().map(|a| a.attempted_at).max(),
            })
        }

        async fn count_by_username(
            &self,
            username: &str,
            reason: FailureReason,
            since: DateTime<Utc>,
        ) -> Result<u32, Error> {
            let attempts = self.attempts.lock().unwrap();
            Ok(attempts
                .iter()
                .filter(|a| {
                    a.username == username && a.reason == reason && a.attempted_at >= since
                })
                .count() as u32)
        }

        async fn clear_source(&self, source_addr: &str) -> Result<u64, Error> {
            let mut attempts = self.attempts.lock().unwrap();
            let before_len = attempts.len();
            attempts.retain(|a| a.source_addr != source_addr);
            Ok((before_len - attempts.len()) as u64)
        }

        async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
            let mut attempts = self.attempts.lock().unwrap();
            let before_len = attempts.len();
            attempts.retain(|a| a.attempted_at >= cutoff);
            Ok((before_len - attempts.len()) as u64)
        }
    }

    struct MockEventRepository {
        events: Mutex<Vec<SecurityEvent>>,
    }

    impl MockEventRepository {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EventRepository for MockEventRepository {
        async fn record(&self, event: &NewSecurityEvent) -> Result<SecurityEvent, Error> {
            let recorded = SecurityEvent {
                id: Uuid::new_v4(),
                kind: event.kind,
                severity: event.severity,
                source_addr: event.source_addr.clone(),
                username: event.username.clone(),
                details: event.details.clone(),
                resolved: false,
                created_at: event.created_at,
            };
            self.events.lock().unwrap().push(recorded.clone());
            Ok(recorded)
        }

        async fn recent(&self, limit: u32) -> Result<Vec<SecurityEvent>, Error> {
            let events = self.events.lock().unwrap();
            Ok(events.iter().rev().take(limit as usize).cloned().collect())
        }

        async fn resolve(&self, id: &Uuid) -> Result<bool, Error> {
            let mut events = self.events.lock().unwrap();
            match events.iter_mut().find(|e| &e.id == id) {
                Some(event) => {
                    event.resolved = true;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    struct Harness {
        attempts: Arc<MockAttemptRepository>,
        events: Arc<MockEventRepository>,
        clock: Arc<FixedClock>,
        service: ProtectionService<MockAttemptRepository, MockEventRepository>,
    }

    fn harness(config: AuthConfig) -> Harness {
        let attempts = Arc::new(MockAttemptRepository::new());
        let events = Arc::new(MockEventRepository::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let service = ProtectionService::new(
            attempts.clone(),
            events.clone(),
            config,
            clock.clone(),
        );
        Harness {
            attempts,
            events,
            clock,
            service,
        }
    }

    fn attempt(harness: &Harness, reason: FailureReason) -> NewFailedAttempt {
        NewFailedAttempt {
            username: "gateway-01".to_string(),
            source_addr: "203.0.113.9".to_string(),
            user_agent: Some("fleet-agent/2.4 linux-armv7".to_string()),
            reason,
            suspicious: false,
            attempted_at: harness.clock.now(),
        }
    }

    #[tokio::test]
    async fn test_source_blocked_at_threshold() {
        let h = harness(AuthConfig::new().with_max_source_attempts(3));

        for i in 0..2 {
            let (_, follow) = h
                .service
                .record_failure(&attempt(&h, FailureReason::BadPassword))
                .await
                .unwrap();
            assert!(!follow.source.is_blocked, "attempt {} should not block", i);
            assert!(!follow.source_crossed);
        }

        let (_, follow) = h
            .service
            .record_failure(&attempt(&h, FailureReason::BadPassword))
            .await
            .unwrap();
        assert!(follow.source.is_blocked);
        assert!(follow.source_crossed);
        assert_eq!(follow.source.failed_attempts, 3);
    }

    #[tokio::test]
    async fn test_source_cooldown_expires_with_window() {
        let h = harness(
            AuthConfig::new()
                .with_max_source_attempts(3)
                .with_source_window(Duration::minutes(30)),
        );

        for _ in 0..3 {
            h.service
                .record_failure(&attempt(&h, FailureReason::BadPassword))
                .await
                .unwrap();
        }

        let status = h.service.source_status("203.0.113.9").await.unwrap();
        assert!(status.is_blocked);
        assert_eq!(status.remaining_seconds, 1800);

        // At the window boundary the latest attempt has aged out
        h.clock.advance(Duration::minutes(30));
        let status = h.service.source_status("203.0.113.9").await.unwrap();
        assert!(!status.is_blocked);
        assert_eq!(status.remaining_seconds, 0);
    }

    #[tokio::test]
    async fn test_blocked_source_cooldown_extends() {
        let h = harness(
            AuthConfig::new()
                .with_max_source_attempts(3)
                .with_source_window(Duration::minutes(30)),
        );

        for _ in 0..3 {
            h.service
                .record_failure(&attempt(&h, FailureReason::BadPassword))
                .await
                .unwrap();
        }

        // Ten minutes in, another attempt pushes the expiry out again
        h.clock.advance(Duration::minutes(10));
        let (_, follow) = h
            .service
            .record_failure(&attempt(&h, FailureReason::SourceBlocked))
            .await
            .unwrap();
        assert!(follow.source.is_blocked);
        assert_eq!(follow.source.remaining_seconds, 1800);
        assert!(!follow.source_crossed, "crossing already happened");
    }

    #[tokio::test]
    async fn test_source_overrun_at_twice_threshold() {
        let h = harness(AuthConfig::new().with_max_source_attempts(3));

        for _ in 0..5 {
            let (_, follow) = h
                .service
                .record_failure(&attempt(&h, FailureReason::SourceBlocked))
                .await
                .unwrap();
            assert!(!follow.source_overrun);
        }

        let (_, follow) = h
            .service
            .record_failure(&attempt(&h, FailureReason::SourceBlocked))
            .await
            .unwrap();
        assert!(follow.source_overrun);
        assert_eq!(follow.source.failed_attempts, 6);
    }

    #[tokio::test]
    async fn test_unknown_source_never_blocked() {
        let h = harness(AuthConfig::new().with_max_source_attempts(2));

        for _ in 0..10 {
            let mut unattributed = attempt(&h, FailureReason::BadPassword);
            unattributed.source_addr = UNKNOWN_SOURCE.to_string();
            let (_, follow) = h.service.record_failure(&unattributed).await.unwrap();
            assert!(!follow.source.is_blocked);
            assert!(!follow.source_crossed);
        }

        let status = h.service.source_status(UNKNOWN_SOURCE).await.unwrap();
        assert!(!status.is_blocked);
        assert_eq!(status.failed_attempts, 0);
    }

    #[tokio::test]
    async fn test_enumeration_crossed_at_exact_threshold() {
        let h = harness(AuthConfig::new());

        for i in 1..=4 {
            let (_, follow) = h
                .service
                .record_failure(&attempt(&h, FailureReason::UnknownUsername))
                .await
                .unwrap();
            assert_eq!(
                follow.enumeration_crossed,
                i == 3,
                "only the third probe crosses, attempt {}",
                i
            );
        }
    }

    #[tokio::test]
    async fn test_enumeration_ignores_other_reasons() {
        let h = harness(AuthConfig::new());

        for _ in 0..5 {
            let (_, follow) = h
                .service
                .record_failure(&attempt(&h, FailureReason::BadPassword))
                .await
                .unwrap();
            assert!(!follow.enumeration_crossed);
        }
    }

    #[tokio::test]
    async fn test_suspicion_indicator_agent_strings() {
        let h = harness(AuthConfig::new());
        let now = h.clock.now();

        let cases = [
            (None, true),
            (Some("curl/8"), true),
            (Some("Mozilla/5.0 compatible Googlebot/2.1"), true),
            (Some("fleet-agent/2.4 linux-armv7"), false),
        ];
        for (agent, expected) in cases {
            let indicator = h
                .service
                .suspicion_indicator("203.0.113.9", agent, now)
                .await
                .unwrap();
            assert_eq!(indicator.is_some(), expected, "agent {:?}", agent);
        }
    }

    #[tokio::test]
    async fn test_suspicion_indicator_hourly_volume() {
        let h = harness(AuthConfig::new().with_source_hourly_threshold(5));

        let now = h.clock.now();
        let indicator = h
            .service
            .suspicion_indicator("203.0.113.9", Some("fleet-agent/2.4 linux-armv7"), now)
            .await
            .unwrap();
        assert!(indicator.is_none());

        for _ in 0..5 {
            h.service
                .record_failure(&attempt(&h, FailureReason::BadPassword))
                .await
                .unwrap();
        }

        let indicator = h
            .service
            .suspicion_indicator("203.0.113.9", Some("fleet-agent/2.4 linux-armv7"), now)
            .await
            .unwrap();
        assert!(indicator.unwrap().contains("last hour"));
    }

    #[tokio::test]
    async fn test_emit_records_event_with_kind_severity() {
        let h = harness(AuthConfig::new());

        let event = h
            .service
            .emit(NewSecurityEvent::new(
                SecurityEventKind::SourceCooldownTriggered,
                "203.0.113.9",
                None,
                "Source placed in cooldown after 10 failed attempts in window",
                h.clock.now(),
            ))
            .await
            .unwrap();

        assert_eq!(event.severity, event.kind.severity());
        assert!(!event.resolved);

        let recent = h.service.recent_events(10).await.unwrap();
        assert_eq!(recent.len(), 1);

        assert!(h.service.resolve_event(&event.id).await.unwrap());
        assert!(!h.service.resolve_event(&Uuid::new_v4()).await.unwrap());
        assert!(h.events.events.lock().unwrap()[0].resolved);
    }

    #[tokio::test]
    async fn test_prune_never_cuts_into_source_window() {
        let h = harness(
            AuthConfig::new()
                .with_source_window(Duration::minutes(30))
                .with_retention_period(Duration::minutes(10)),
        );

        h.service
            .record_failure(&attempt(&h, FailureReason::BadPassword))
            .await
            .unwrap();

        // Past the configured retention but still inside the source window
        h.clock.advance(Duration::minutes(20));
        assert_eq!(h.service.prune_expired().await.unwrap(), 0);
        assert_eq!(h.attempts.attempts.lock().unwrap().len(), 1);

        h.clock.advance(Duration::minutes(11));
        assert_eq!(h.service.prune_expired().await.unwrap(), 1);
        assert!(h.attempts.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_source_removes_tally() {
        let h = harness(AuthConfig::new().with_max_source_attempts(2));

        for _ in 0..2 {
            h.service
                .record_failure(&attempt(&h, FailureReason::BadPassword))
                .await
                .unwrap();
        }
        assert!(h.service.source_status("203.0.113.9").await.unwrap().is_blocked);

        assert_eq!(h.service.clear_source("203.0.113.9").await.unwrap(), 2);
        assert!(!h.service.source_status("203.0.113.9").await.unwrap().is_blocked);
    }

    #[tokio::test]
    async fn test_maintenance_task_stops_on_shutdown() {
        let h = harness(AuthConfig::new());
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let handle = h.service.start_maintenance_task(shutdown_rx);
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
