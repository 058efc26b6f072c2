use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use warden_core::{
    Error,
    account::{Account, AccountId, NewAccount},
    attempt::NewFailedAttempt,
    error::StorageError,
    repositories::{AccountRepository, PasswordFailure},
};

use super::attempt::SqliteFailedAttempt;

pub struct SqliteAccountRepository {
    pool: SqlitePool,
}

impl SqliteAccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteAccount {
    id: String,
    username: String,
    password_hash: String,
    failed_count: i64,
    locked_until: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl From<SqliteAccount> for Account {
    fn from(row: SqliteAccount) -> Self {
        Account {
            id: AccountId::new(&row.id),
            username: row.username,
            password_hash: row.password_hash,
            failed_count: row.failed_count as u32,
            locked_until: row
                .locked_until
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            created_at: DateTime::from_timestamp(row.created_at, 0).expect("Invalid timestamp"),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).expect("Invalid timestamp"),
        }
    }
}

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn create(&self, account: NewAccount) -> Result<Account, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteAccount>(
            r#"
            INSERT INTO accounts (id, username, password_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::Constraint("username already exists".to_string())
            }
            _ => {
                tracing::error!(error = %e, "Failed to create account");
                StorageError::Database("Failed to create account".to_string())
            }
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>("SELECT * FROM accounts WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to find account by id");
                StorageError::Database("Failed to find account by id".to_string())
            })?;

        Ok(row.map(|a| a.into()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, SqliteAccount>("SELECT * FROM accounts WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to find account by username");
                StorageError::Database("Failed to find account by username".to_string())
            })?;

        Ok(row.map(|a| a.into()))
    }

    async fn record_failed_password(
        &self,
        id: &AccountId,
        attempt: &NewFailedAttempt,
        lock_threshold: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<PasswordFailure, Error> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to begin transaction");
            StorageError::Database("Failed to record password failure".to_string())
        })?;

        let attempt_row = sqlx::query_as::<_, SqliteFailedAttempt>(
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
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record password failure");
            StorageError::Database("Failed to record password failure".to_string())
        })?;

        // Single conditional statement: crossing the threshold zeroes the
        // counter and sets the expiry in the same write, so a concurrent
        // increment can never observe a half-applied lockout. Below the
        // threshold the expiry column is left untouched.
        let account_row = sqlx::query_as::<_, SqliteAccount>(
            r#"
            UPDATE accounts
            SET failed_count = CASE WHEN failed_count + 1 >= ?2 THEN 0 ELSE failed_count + 1 END,
                locked_until = CASE WHEN failed_count + 1 >= ?2 THEN ?3 ELSE locked_until END,
                updated_at = ?4
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id.as_str())
        .bind(lock_threshold)
        .bind(lock_until.timestamp())
        .bind(attempt.attempted_at.timestamp())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            e => {
                tracing::error!(error = %e, "Failed to record password failure");
                StorageError::Database("Failed to record password failure".to_string())
            }
        })?;

        tx.commit().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to commit transaction");
            StorageError::Database("Failed to record password failure".to_string())
        })?;

        Ok(PasswordFailure {
            account: account_row.into(),
            attempt: attempt_row.into(),
        })
    }

    async fn reset_lockout(&self, id: &AccountId) -> Result<Account, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteAccount>(
            r#"
            UPDATE accounts
            SET failed_count = 0, locked_until = NULL, updated_at = ?2
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            e => {
                tracing::error!(error = %e, "Failed to reset lockout");
                StorageError::Database("Failed to reset lockout".to_string())
            }
        })?;

        Ok(row.into())
    }
}
