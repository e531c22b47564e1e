//! In-memory user store.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{SubscriptionAttributes, User};
use crate::domain::foundation::DomainError;
use crate::ports::UserRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<Vec<User>>>,
    fail_updates: Arc<RwLock<bool>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: User) {
        self.users.write().await.push(user);
    }

    pub async fn all(&self) -> Vec<User> {
        self.users.read().await.clone()
    }

    /// Makes subsequent updates fail with a database error.
    pub async fn set_failing(&self, failing: bool) {
        *self.fail_updates.write().await = failing;
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn update_subscription_by_email(
        &self,
        email: &str,
        attributes: &SubscriptionAttributes,
    ) -> Result<u64, DomainError> {
        if *self.fail_updates.read().await {
            return Err(DomainError::database("user store unavailable"));
        }

        let mut users = self.users.write().await;
        let mut updated = 0;
        for user in users.iter_mut().filter(|u| u.email == email) {
            user.apply(attributes);
            updated += 1;
        }
        Ok(updated)
    }
}
