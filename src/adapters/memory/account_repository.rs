//! In-memory account store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::Account;
use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::ports::AccountRepository;

/// In-memory account storage, for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountRepository {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
    writes: Arc<RwLock<u64>>,
    failing: Arc<RwLock<bool>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account as onboarding would.
    pub async fn insert(&self, account: Account) {
        self.accounts.write().await.insert(account.id.clone(), account);
    }

    pub async fn get(&self, id: &AccountId) -> Option<Account> {
        self.accounts.read().await.get(id).cloned()
    }

    /// Number of `update` calls that reached the store.
    pub async fn write_count(&self) -> u64 {
        *self.writes.read().await
    }

    /// Make every call fail with a database error until reset.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    async fn check_available(&self) -> Result<(), DomainError> {
        if *self.failing.read().await {
            return Err(DomainError::database("account store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        self.check_available().await?;
        Ok(self.accounts.read().await.get(id).cloned())
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Account>, DomainError> {
        self.check_available().await?;
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.stripe_subscription_id.as_deref() == Some(subscription_id))
            .cloned())
    }

    async fn find_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Account>, DomainError> {
        self.check_available().await?;
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.stripe_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn update(&self, account: &Account) -> Result<(), DomainError> {
        self.check_available().await?;
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account.clone();
                *self.writes.write().await += 1;
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::AccountNotFound,
                format!("Account {} not found", account.id),
            )),
        }
    }
}
