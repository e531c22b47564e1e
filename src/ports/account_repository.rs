//! Account repository port.
//!
//! Accounts are created by onboarding. This subsystem looks them up by the
//! identifiers a provider event can carry and writes reconciled values back.

use async_trait::async_trait;

use crate::domain::billing::Account;
use crate::domain::foundation::{AccountId, DomainError};

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find an account by its internal id.
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError>;

    /// Find the account whose stored external subscription id matches.
    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Account>, DomainError>;

    /// Find the account whose stored external customer id matches.
    async fn find_by_customer_id(&self, customer_id: &str)
        -> Result<Option<Account>, DomainError>;

    /// Write plan, seats and provider references of an existing account.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, account: &Account) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn account_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn AccountRepository) {}
    }
}
