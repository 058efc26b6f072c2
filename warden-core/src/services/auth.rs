//! Authentication pipeline.
//!
//! [`AuthService::authenticate`] runs the full login decision: source
//! cooldown first, then advisory heuristics, account lookup, lockout check,
//! and finally password verification. Every failed call appends exactly one
//! ledger entry; at most one security event is emitted per call, the
//! highest-priority candidate the call produced.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    Error,
    account::Account,
    attempt::{FailedAttempt, FailureReason, NewFailedAttempt},
    clock::Clock,
    error::{AuthError, BlockedError},
    event::{NewSecurityEvent, SecurityEventKind},
    policy::{AccountLockState, ENUMERATION_THRESHOLD},
    repositories::{AccountRepository, AttemptRepository, EventRepository},
    services::{account::verify_password, protection::FollowUp, ProtectionService},
    token::{AccessToken, TokenIssuer},
    validation::{normalize_username, validate_login_input},
};

/// Successful authentication: the account and a freshly issued token.
#[derive(Debug)]
pub struct AuthSuccess {
    pub account: Account,
    pub token: AccessToken,
}

/// Service orchestrating login decisions.
///
/// The clock is read once per call; every window comparison and timestamp
/// written during that call derives from the same reading.
pub struct AuthService<A, L, E>
where
    A: AccountRepository,
    L: AttemptRepository,
    E: EventRepository,
{
    accounts: Arc<A>,
    protection: Arc<ProtectionService<L, E>>,
    issuer: Arc<TokenIssuer>,
    clock: Arc<dyn Clock>,
}

impl<A, L, E> AuthService<A, L, E>
where
    A: AccountRepository,
    L: AttemptRepository,
    E: EventRepository,
{
    /// Create a new AuthService.
    pub fn new(
        accounts: Arc<A>,
        protection: Arc<ProtectionService<L, E>>,
        issuer: Arc<TokenIssuer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            protection,
            issuer,
            clock,
        }
    }

    /// Authenticate a login request.
    ///
    /// Unknown usernames and wrong passwords both come back as
    /// [`AuthError::InvalidCredentials`]; callers must not leak which one it
    /// was. Cooldowns and lockouts surface as [`BlockedError`] with the
    /// seconds until the block lifts.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        source_addr: &str,
        user_agent: Option<&str>,
    ) -> Result<AuthSuccess, Error> {
        let now = self.clock.now();
        let username = normalize_username(username);
        validate_login_input(&username, password)?;

        let policy = self.protection.policy();

        // Source track first, before the account is even looked up
        let source = self.protection.source_status_at(source_addr, now).await?;
        if source.is_blocked {
            let attempt =
                self.new_attempt(&username, source_addr, user_agent, FailureReason::SourceBlocked, now);
            let (recorded, follow) = self.protection.record_failure(&attempt).await?;
            self.emit_highest(&recorded, &follow, false, None).await?;

            tracing::warn!(source_addr = source_addr, "Login refused, source in cooldown");

            // The refused attempt itself pushed the expiry out, so report
            // the extended cooldown, not the one the check saw
            return Err(BlockedError::SourceCooldown {
                retry_after_secs: follow.source.remaining_seconds,
            }
            .into());
        }

        // Advisory heuristics; candidate only, emitted at the end if nothing
        // more severe happens
        let suspicion = self
            .protection
            .suspicion_indicator(source_addr, user_agent, now)
            .await?;

        let Some(account) = self.accounts.find_by_username(&username).await? else {
            let attempt =
                self.new_attempt(&username, source_addr, user_agent, FailureReason::UnknownUsername, now);
            let (recorded, follow) = self.protection.record_failure(&attempt).await?;
            self.emit_highest(&recorded, &follow, false, suspicion).await?;

            return Err(AuthError::InvalidCredentials.into());
        };

        match policy.account_state(&account, now) {
            AccountLockState::Locked {
                remaining_seconds, ..
            } => {
                let attempt =
                    self.new_attempt(&username, source_addr, user_agent, FailureReason::AccountLocked, now);
                let (recorded, follow) = self.protection.record_failure(&attempt).await?;
                self.emit_highest(&recorded, &follow, false, suspicion).await?;

                tracing::warn!(account_id = %account.id, "Login refused, account locked");

                return Err(BlockedError::AccountLocked {
                    retry_after_secs: remaining_seconds,
                }
                .into());
            }
            // An expired lockout resets lazily; the counter restarts from
            // zero on whichever branch runs next
            AccountLockState::Active { .. } | AccountLockState::LockoutExpired => {}
        }

        if !verify_password(password, &account.password_hash) {
            let attempt =
                self.new_attempt(&username, source_addr, user_agent, FailureReason::BadPassword, now);
            let failure = self
                .accounts
                .record_failed_password(
                    &account.id,
                    &attempt,
                    policy.config().max_account_attempts,
                    policy.lockout_expiry(now),
                )
                .await?;
            let follow = self.protection.followup(&failure.attempt).await?;

            // The conditional update zeroes the counter exactly when it sets
            // the lockout, so this pair identifies the crossing write
            let account_crossed =
                failure.account.failed_count == 0 && failure.account.is_locked(now);
            self.emit_highest(&failure.attempt, &follow, account_crossed, suspicion)
                .await?;

            return Err(AuthError::InvalidCredentials.into());
        }

        // Success: settle any stale counter state, then issue a token
        let account = if account.failed_count > 0 || account.locked_until.is_some() {
            self.accounts.reset_lockout(&account.id).await?
        } else {
            account
        };

        if policy.config().reset_source_on_success {
            self.protection.clear_source(source_addr).await?;
        }

        if let Some(details) = suspicion {
            self.protection
                .emit(NewSecurityEvent::new(
                    SecurityEventKind::SuspiciousPattern,
                    source_addr,
                    Some(account.username.clone()),
                    details,
                    now,
                ))
                .await?;
        }

        let token = self.issuer.issue(&account.username, now)?;

        tracing::info!(account_id = %account.id, "Authenticated account");

        Ok(AuthSuccess { account, token })
    }

    /// Resolve the account behind a bearer token.
    pub async fn current_account(&self, token: &str) -> Result<Account, Error> {
        let claims = self.issuer.validate(token)?;
        self.accounts
            .find_by_username(&claims.sub)
            .await?
            .ok_or_else(|| AuthError::AccountNotFound.into())
    }

    fn new_attempt(
        &self,
        username: &str,
        source_addr: &str,
        user_agent: Option<&str>,
        reason: FailureReason,
        now: DateTime<Utc>,
    ) -> NewFailedAttempt {
        NewFailedAttempt {
            username: username.to_string(),
            source_addr: source_addr.to_string(),
            user_agent: user_agent.map(|s| s.to_string()),
            reason,
            suspicious: self
                .protection
                .policy()
                .attempt_is_suspicious(user_agent, reason),
            attempted_at: now,
        }
    }

    /// Emit the single highest-priority event candidate of a failed call.
    async fn emit_highest(
        &self,
        attempt: &FailedAttempt,
        follow: &FollowUp,
        account_crossed: bool,
        suspicion: Option<String>,
    ) -> Result<(), Error> {
        let config = self.protection.config();
        let now = attempt.attempted_at;

        let event = if follow.source_overrun {
            Some(NewSecurityEvent::new(
                SecurityEventKind::BruteForceSource,
                attempt.source_addr.as_str(),
                None,
                format!(
                    "Source kept attacking through cooldown, {} failed attempts in window",
                    follow.source.failed_attempts
                ),
                now,
            ))
        } else if account_crossed {
            Some(NewSecurityEvent::new(
                SecurityEventKind::BruteForceAccount,
                attempt.source_addr.as_str(),
                Some(attempt.username.clone()),
                format!(
                    "Account locked after {} consecutive failed passwords",
                    config.max_account_attempts
                ),
                now,
            ))
        } else if follow.source_crossed {
            Some(NewSecurityEvent::new(
                SecurityEventKind::SourceCooldownTriggered,
                attempt.source_addr.as_str(),
                None,
                format!(
                    "Source placed in cooldown after {} failed attempts in window",
                    follow.source.failed_attempts
                ),
                now,
            ))
        } else if follow.enumeration_crossed {
            Some(NewSecurityEvent::new(
                SecurityEventKind::UsernameEnumeration,
                attempt.source_addr.as_str(),
                Some(attempt.username.clone()),
                format!(
                    "Unknown username probed {ENUMERATION_THRESHOLD} times within the last hour"
                ),
                now,
            ))
        } else {
            suspicion.map(|details| {
                NewSecurityEvent::new(
                    SecurityEventKind::SuspiciousPattern,
                    attempt.source_addr.as_str(),
                    Some(attempt.username.clone()),
                    details,
                    now,
                )
            })
        };

        if let Some(event) = event {
            self.protection.emit(event).await?;
        }

        Ok(())
    }
}
