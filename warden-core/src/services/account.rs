use std::sync::Arc;

use crate::{
    Clock, Error,
    account::{Account, AccountId, NewAccount},
    error::AuthError,
    repositories::AccountRepository,
    validation::{normalize_username, validate_password_strength, validate_username},
};

/// Service for account management operations
pub struct AccountService<R: AccountRepository> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R: AccountRepository> AccountService<R> {
    /// Create a new AccountService with the given repository
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Register a new account.
    ///
    /// The username is normalized to lowercase before any lookup or insert,
    /// so `Gateway-01` and `gateway-01` are the same account. Registration
    /// applies the full validation rules; login validation is deliberately
    /// looser so that probe input cannot be distinguished from bad
    /// credentials by a validation error.
    pub async fn register(&self, username: &str, password: &str) -> Result<Account, Error> {
        let username = normalize_username(username);
        validate_username(&username)?;
        validate_password_strength(password)?;

        if self.repository.find_by_username(&username).await?.is_some() {
            return Err(AuthError::UsernameTaken.into());
        }

        let password_hash = hash_password(password);
        let new_account = NewAccount {
            id: AccountId::new_random(),
            username,
            password_hash,
        };

        let account = self.repository.create(new_account).await?;

        tracing::info!(account_id = %account.id, "Registered new account");

        Ok(account)
    }

    /// Get an account by its username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
        let username = normalize_username(username);
        self.repository.find_by_username(&username).await
    }

    /// Get an account by ID
    pub async fn get_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        self.repository.find_by_id(id).await
    }

    /// Unlock an account (operator action).
    ///
    /// Clears any lockout and resets the failure counter regardless of the
    /// account's previous state.
    ///
    /// # Returns
    ///
    /// `true` if the account was previously locked, `false` otherwise.
    pub async fn unlock(&self, username: &str) -> Result<bool, Error> {
        let account = self
            .get_by_username(username)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let was_locked = account.is_locked(self.clock.now());
        self.repository.reset_lockout(&account.id).await?;

        if was_locked {
            tracing::info!(account_id = %account.id, "Unlocked account");
        }

        Ok(was_locked)
    }
}

/// Hash a password using argon2
pub(crate) fn hash_password(password: &str) -> String {
    password_auth::generate_hash(password)
}

/// Verify a password against a stored hash
pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    password_auth::verify_password(password, hash).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::ValidationError;
    use crate::repositories::PasswordFailure;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MockAccountRepository {
        accounts: Arc<Mutex<HashMap<String, Account>>>,
    }

    #[async_trait]
    impl AccountRepository for MockAccountRepository {
        async fn create(&self, new_account: NewAccount) -> Result<Account, Error> {
            let now = Utc::now();
            let account = Account {
                id: new_account.id,
                username: new_account.username.clone(),
                password_hash: new_account.password_hash,
                failed_count: 0,
                locked_until: None,
                created_at: now,
                updated_at: now,
            };
            self.accounts
                .lock()
                .await
                .insert(new_account.username, account.clone());
            Ok(account)
        }

        async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, Error> {
            Ok(self
                .accounts
                .lock()
                .await
                .values()
                .find(|a| &a.id == id)
                .cloned())
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<Account>, Error> {
            Ok(self.accounts.lock().await.get(username).cloned())
        }

        async fn record_failed_password(
            &self,
            _id: &AccountId,
            _attempt: &crate::attempt::NewFailedAttempt,
            _lock_threshold: u32,
            _lock_until: DateTime<Utc>,
        ) -> Result<PasswordFailure, Error> {
            unimplemented!()
        }

        async fn reset_lockout(&self, id: &AccountId) -> Result<Account, Error> {
            let mut accounts = self.accounts.lock().await;
            let account = accounts
                .values_mut()
                .find(|a| &a.id == id)
                .ok_or(crate::error::StorageError::NotFound)?;
            account.failed_count = 0;
            account.locked_until = None;
            Ok(account.clone())
        }
    }

    fn service(repo: Arc<MockAccountRepository>) -> AccountService<MockAccountRepository> {
        AccountService::new(repo, Arc::new(FixedClock::new(Utc::now())))
    }

    #[tokio::test]
    async fn test_register_normalizes_username() {
        let repo = Arc::new(MockAccountRepository::default());
        let service = service(repo.clone());

        let account = service
            .register("Gateway-01", "Sensor#Mesh77")
            .await
            .unwrap();
        assert_eq!(account.username, "gateway-01");

        // Lookup with different casing resolves to the same account
        let found = service.get_by_username("GATEWAY-01").await.unwrap();
        assert_eq!(found.unwrap().id, account.id);
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let repo = Arc::new(MockAccountRepository::default());
        let service = service(repo.clone());

        let result = service.register("gateway-01", "weak").await;
        match result.unwrap_err() {
            Error::Validation(ValidationError::InvalidPassword(_)) => {}
            e => panic!("Expected ValidationError::InvalidPassword, got {:?}", e),
        }

        // Verify no account was created
        assert!(repo.accounts.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_username() {
        let repo = Arc::new(MockAccountRepository::default());
        let service = service(repo);

        service
            .register("gateway-01", "Sensor#Mesh77")
            .await
            .unwrap();
        let result = service.register("Gateway-01", "Other#Secret9").await;

        assert!(matches!(
            result.unwrap_err(),
            Error::Auth(AuthError::UsernameTaken)
        ));
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_password() {
        let repo = Arc::new(MockAccountRepository::default());
        let service = service(repo.clone());

        service
            .register("gateway-01", "Sensor#Mesh77")
            .await
            .unwrap();

        let accounts = repo.accounts.lock().await;
        let stored = accounts.get("gateway-01").unwrap();
        assert_ne!(stored.password_hash, "Sensor#Mesh77");
        assert!(verify_password("Sensor#Mesh77", &stored.password_hash));
    }

    #[tokio::test]
    async fn test_unlock_reports_previous_state() {
        let repo = Arc::new(MockAccountRepository::default());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let service = AccountService::new(repo.clone(), clock.clone());

        let account = service
            .register("gateway-01", "Sensor#Mesh77")
            .await
            .unwrap();

        // Lock the account directly
        repo.accounts
            .lock()
            .await
            .get_mut("gateway-01")
            .unwrap()
            .locked_until = Some(clock.now() + Duration::minutes(15));

        assert!(service.unlock("gateway-01").await.unwrap());
        assert!(!service.unlock("gateway-01").await.unwrap());

        let found = service.get_by_id(&account.id).await.unwrap().unwrap();
        assert!(found.locked_until.is_none());
    }

    #[tokio::test]
    async fn test_unlock_unknown_account() {
        let repo = Arc::new(MockAccountRepository::default());
        let service = service(repo);

        let result = service.unlock("nobody").await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Auth(AuthError::AccountNotFound)
        ));
    }
}
