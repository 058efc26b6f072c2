//! SQLite implementation of the security event repository.

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::SqlitePool;
use uuid::Uuid;
use warden_core::{
    Error,
    error::StorageError,
    event::{NewSecurityEvent, SecurityEvent},
    repositories::EventRepository,
};

/// SQLite repository for recorded security events.
pub struct SqliteEventRepository {
    pool: SqlitePool,
}

impl SqliteEventRepository {
    /// Create a new SQLite event repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteSecurityEvent {
    id: String,
    kind: String,
    severity: String,
    source_addr: String,
    username: Option<String>,
    details: String,
    resolved: bool,
    created_at: i64,
}

impl From<SqliteSecurityEvent> for SecurityEvent {
    fn from(row: SqliteSecurityEvent) -> Self {
        SecurityEvent {
            id: Uuid::parse_str(&row.id).expect("Invalid event id"),
            kind: row.kind.parse().expect("Invalid event kind"),
            severity: row.severity.parse().expect("Invalid severity"),
            source_addr: row.source_addr,
            username: row.username,
            details: row.details,
            resolved: row.resolved,
            created_at: DateTime::from_timestamp(row.created_at, 0).expect("Invalid timestamp"),
        }
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn record(&self, event: &NewSecurityEvent) -> Result<SecurityEvent, Error> {
        let id = Uuid::new_v4();

        let row = sqlx::query_as::<_, SqliteSecurityEvent>(
            r#"
            INSERT INTO security_events (id, kind, severity, source_addr, username, details, resolved, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
            RETURNING id, kind, severity, source_addr, username, details, resolved, created_at
            "#,
        )
        .bind(id.to_string())
        .bind(event.kind.as_str())
        .bind(event.severity.as_str())
        .bind(&event.source_addr)
        .bind(&event.username)
        .bind(&event.details)
        .bind(event.created_at.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record security event");
            StorageError::Database("Failed to record security event".to_string())
        })?;

        Ok(row.into())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<SecurityEvent>, Error> {
        let rows = sqlx::query_as::<_, SqliteSecurityEvent>(
            r#"
            SELECT id, kind, severity, source_addr, username, details, resolved, created_at
            FROM security_events
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list security events");
            StorageError::Database("Failed to list security events".to_string())
        })?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn resolve(&self, id: &Uuid) -> Result<bool, Error> {
        let result = sqlx::query("UPDATE security_events SET resolved = 1 WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to resolve security event");
                StorageError::Database("Failed to resolve security event".to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::{
        CreateAccountsTable, CreateFailedAttemptsTable, CreateIndexes, CreateSecurityEventsTable,
        SqliteMigrationManager,
    };
    use chrono::{Duration, Utc};
    use warden_core::event::{SecurityEventKind, Severity};
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

    #[tokio::test]
    async fn test_record_event() {
        let pool = setup_test_db().await;
        let repo = SqliteEventRepository::new(pool);

        let event = repo
            .record(&NewSecurityEvent::new(
                SecurityEventKind::SourceCooldownTriggered,
                "203.0.113.9",
                None,
                "10 failed attempts in window",
                Utc::now(),
            ))
            .await
            .expect("Failed to record event");

        assert_eq!(event.kind, SecurityEventKind::SourceCooldownTriggered);
        assert_eq!(event.severity, Severity::High);
        assert_eq!(event.source_addr, "203.0.113.9");
        assert!(event.username.is_none());
        assert!(!event.resolved);
    }

    #[tokio::test]
    async fn test_recent_orders_newest_first() {
        let pool = setup_test_db().await;
        let repo = SqliteEventRepository::new(pool);
        let now = Utc::now();

        for (i, kind) in [
            SecurityEventKind::SuspiciousPattern,
            SecurityEventKind::UsernameEnumeration,
            SecurityEventKind::BruteForceAccount,
        ]
        .into_iter()
        .enumerate()
        {
            repo.record(&NewSecurityEvent::new(
                kind,
                "203.0.113.9",
                Some("gateway-01".to_string()),
                "probe",
                now + Duration::seconds(i as i64),
            ))
            .await
            .unwrap();
        }

        let recent = repo.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].kind, SecurityEventKind::BruteForceAccount);
        assert_eq!(recent[1].kind, SecurityEventKind::UsernameEnumeration);
    }

    #[tokio::test]
    async fn test_resolve_event() {
        let pool = setup_test_db().await;
        let repo = SqliteEventRepository::new(pool);

        let event = repo
            .record(&NewSecurityEvent::new(
                SecurityEventKind::BruteForceSource,
                "203.0.113.9",
                None,
                "20 failed attempts in window",
                Utc::now(),
            ))
            .await
            .unwrap();

        assert!(repo.resolve(&event.id).await.unwrap());
        let recent = repo.recent(1).await.unwrap();
        assert!(recent[0].resolved);

        // Unknown ids resolve to false
        assert!(!repo.resolve(&Uuid::new_v4()).await.unwrap());
    }
}
