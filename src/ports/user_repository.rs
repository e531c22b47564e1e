//! User repository port.

use async_trait::async_trait;

use crate::domain::billing::SubscriptionAttributes;
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Applies subscription attributes to every user whose email equals
    /// `email` exactly (case-sensitive).
    ///
    /// Returns the number of rows updated; zero, one or many are all valid.
    async fn update_subscription_by_email(
        &self,
        email: &str,
        attributes: &SubscriptionAttributes,
    ) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn UserRepository) {}
    }
}
