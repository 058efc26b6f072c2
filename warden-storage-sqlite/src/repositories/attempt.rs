//! SQLite implementation of the failed-attempt ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use warden_core::{
    Error,
    attempt::{AttemptStats, FailedAttempt, FailureReason, NewFailedAttempt},
    error::StorageError,
    repositories::AttemptRepository,
};

/// SQLite repository for the append-only attempt ledger.
pub struct SqliteAttemptRepository {
    pool: SqlitePool,
}

impl SqliteAttemptRepository {
    /// Create a new SQLite attempt repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SqliteFailedAttempt {
    id: i64,
    username: String,
    source_addr: String,
    user_agent: Option<String>,
    reason: String,
    suspicious: bool,
    attempted_at: i64,
}

impl From<SqliteFailedAttempt> for FailedAttempt {
    fn from(row: SqliteFailedAttempt) -> Self {
        FailedAttempt {
            id: row.id,
            username: row.username,
            source_addr: row.source_addr,
            user_agent: row.user_agent,
            reason: row.reason.parse().expect("Invalid failure reason"),
            suspicious: row.suspicious,
            attempted_at: DateTime::from_timestamp(row.attempted_at, 0)
                .expect("Invalid timestamp"),
        }
    }
}

/// Internal struct for attempt stats query
#[derive(Debug, sqlx::FromRow)]
struct SqliteAttemptStats {
    count: i32,
    latest_at: Option<i64>,
}

#[async_trait]
impl AttemptRepository for SqliteAttemptRepository {
    async fn record(&self, attempt: &NewFailedAttempt) -> Result<FailedAttempt, Error> {
        let row = sqlx::query_as::<_, SqliteFailedAttempt>(
            r#"
            INSERT INTO failed_attempts (username, source_addr, user_agent, reason, suspicious, attempted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, username, source_addr, user_agent, reason, suspicious, attempted_at
            "#,
        )
        .bind(&attempt.username)
        .bind(&attempt.source_addr)
        .bind(&attempt.user_agent)
        .bind(attempt.reason.as_str())
        .bind(attempt.suspicious)
        .bind(attempt.attempted_at.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record attempt");
            StorageError::Database("Failed to record attempt".to_string())
        })?;

        Ok(row.into())
    }

    async fn source_stats(
        &self,
        source_addr: &str,
        since: DateTime<Utc>,
    ) -> Result<AttemptStats, Error> {
        let row = sqlx::query_as::<_, SqliteAttemptStats>(
            r#"
            SELECT
                COUNT(*) as count,
                MAX(attempted_at) as latest_at
            FROM failed_attempts
            WHERE source_addr = ?1 AND attempted_at >= ?2
            "#,
        )
        .bind(source_addr)
        .bind(since.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get source stats");
            StorageError::Database("Failed to get source stats".to_string())
        })?;

        Ok(AttemptStats {
            count: row.count as u32,
            latest_at: row.latest_at.and_then(|ts| DateTime::from_timestamp(ts, 0)),
        })
    }

    async fn count_by_username(
        &self,
        username: &str,
        reason: FailureReason,
        since: DateTime<Utc>,
    ) -> Result<u32, Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM failed_attempts
            WHERE username = ?1 AND reason = ?2 AND attempted_at >= ?3
            "#,
        )
        .bind(username)
        .bind(reason.as_str())
        .bind(since.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to count attempts by username");
            StorageError::Database("Failed to count attempts by username".to_string())
        })?;

        Ok(count as u32)
    }

    async fn clear_source(&self, source_addr: &str) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM failed_attempts WHERE source_addr = ?1")
            .bind(source_addr)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to clear source attempts");
                StorageError::Database("Failed to clear source attempts".to_string())
            })?;

        Ok(result.rows_affected())
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM failed_attempts WHERE attempted_at < ?1")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to prune attempts");
                StorageError::Database("Failed to prune attempts".to_string())
            })?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::{
        CreateAccountsTable, CreateFailedAttemptsTable, CreateIndexes, CreateSecurityEventsTable,
        SqliteMigrationManager,
    };
    use chrono::Duration;
    use warden_migration::{Migration, MigrationManager};

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create pool");

        let manager = SqliteMigrationManager::new(pool.clone());
        manager
            .initialize()
            .await
            .expect("Failed to initialize migrations");

        let migrations: Vec<Box<dyn Migration<sqlx::Sqlite>>> = vec![
            Box::new(CreateAccountsTable),
            Box::new(CreateFailedAttemptsTable),
            Box::new(CreateSecurityEventsTable),
            Box::new(CreateIndexes),
        ];
        manager
            .up(&migrations)
            .await
            .expect("Failed to run migrations");

        pool
    }

    fn attempt_at(
        username: &str,
        source_addr: &str,
        reason: FailureReason,
        attempted_at: DateTime<Utc>,
    ) -> NewFailedAttempt {
        NewFailedAttempt {
            username: username.to_string(),
            source_addr: source_addr.to_string(),
            user_agent: Some("fleet-agent/2.4".to_string()),
            reason,
            suspicious: reason == FailureReason::UnknownUsername,
            attempted_at,
        }
    }

    #[tokio::test]
    async fn test_record_round_trips_fields() {
        let pool = setup_test_db().await;
        let repo = SqliteAttemptRepository::new(pool);

        let recorded = repo
            .record(&attempt_at(
                "gateway-01",
                "203.0.113.9",
                FailureReason::UnknownUsername,
                Utc::now(),
            ))
            .await
            .expect("Failed to record attempt");

        assert!(recorded.id > 0);
        assert_eq!(recorded.username, "gateway-01");
        assert_eq!(recorded.source_addr, "203.0.113.9");
        assert_eq!(recorded.reason, FailureReason::UnknownUsername);
        assert!(recorded.suspicious);
    }

    #[tokio::test]
    async fn test_source_stats_counts_window() {
        let pool = setup_test_db().await;
        let repo = SqliteAttemptRepository::new(pool);
        let now = Utc::now();

        for _ in 0..3 {
            repo.record(&attempt_at(
                "gateway-01",
                "203.0.113.9",
                FailureReason::BadPassword,
                now,
            ))
            .await
            .unwrap();
        }
        // Different source, must not be counted
        repo.record(&attempt_at(
            "gateway-01",
            "198.51.100.7",
            FailureReason::BadPassword,
            now,
        ))
        .await
        .unwrap();

        let stats = repo
            .source_stats("203.0.113.9", now - Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.latest_at.map(|t| t.timestamp()), Some(now.timestamp()));
    }

    #[tokio::test]
    async fn test_source_stats_respects_since() {
        let pool = setup_test_db().await;
        let repo = SqliteAttemptRepository::new(pool);
        let now = Utc::now();

        repo.record(&attempt_at(
            "gateway-01",
            "203.0.113.9",
            FailureReason::BadPassword,
            now - Duration::hours(2),
        ))
        .await
        .unwrap();

        let stats = repo
            .source_stats("203.0.113.9", now - Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(stats.count, 0);
        assert!(stats.latest_at.is_none());
    }

    #[tokio::test]
    async fn test_count_by_username_filters_reason() {
        let pool = setup_test_db().await;
        let repo = SqliteAttemptRepository::new(pool);
        let now = Utc::now();

        for _ in 0..2 {
            repo.record(&attempt_at(
                "no-such-device",
                "203.0.113.9",
                FailureReason::UnknownUsername,
                now,
            ))
            .await
            .unwrap();
        }
        repo.record(&attempt_at(
            "no-such-device",
            "203.0.113.9",
            FailureReason::SourceBlocked,
            now,
        ))
        .await
        .unwrap();
        repo.record(&attempt_at(
            "other-device",
            "203.0.113.9",
            FailureReason::UnknownUsername,
            now,
        ))
        .await
        .unwrap();

        let count = repo
            .count_by_username(
                "no-such-device",
                FailureReason::UnknownUsername,
                now - Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_clear_source_leaves_other_sources() {
        let pool = setup_test_db().await;
        let repo = SqliteAttemptRepository::new(pool);
        let now = Utc::now();

        for _ in 0..3 {
            repo.record(&attempt_at(
                "gateway-01",
                "203.0.113.9",
                FailureReason::BadPassword,
                now,
            ))
            .await
            .unwrap();
        }
        repo.record(&attempt_at(
            "gateway-01",
            "198.51.100.7",
            FailureReason::BadPassword,
            now,
        ))
        .await
        .unwrap();

        let cleared = repo.clear_source("203.0.113.9").await.unwrap();
        assert_eq!(cleared, 3);

        let stats = repo
            .source_stats("198.51.100.7", now - Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(stats.count, 1);
    }

    #[tokio::test]
    async fn test_prune_before_cutoff() {
        let pool = setup_test_db().await;
        let repo = SqliteAttemptRepository::new(pool);
        let now = Utc::now();

        repo.record(&attempt_at(
            "gateway-01",
            "203.0.113.9",
            FailureReason::BadPassword,
            now - Duration::hours(30),
        ))
        .await
        .unwrap();
        repo.record(&attempt_at(
            "gateway-01",
            "203.0.113.9",
            FailureReason::BadPassword,
            now,
        ))
        .await
        .unwrap();

        let pruned = repo.prune_before(now - Duration::hours(24)).await.unwrap();
        assert_eq!(pruned, 1);

        let stats = repo
            .source_stats("203.0.113.9", now - Duration::hours(48))
            .await
            .unwrap();
        assert_eq!(stats.count, 1);
    }
}
