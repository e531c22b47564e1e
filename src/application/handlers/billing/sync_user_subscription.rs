//! UserSubscriptionSync - propagates subscription attributes to users by
//! billing email.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::billing::{PipelineStep, SubscriptionAttributes, WebhookError};
use crate::ports::UserRepository;

/// Updates every user whose email matches the billing email.
///
/// The match is exact and deliberately one-to-many: several logins may
/// share a billing address and all of them receive the attributes.
#[derive(Clone)]
pub struct UserSubscriptionSync {
    users: Arc<dyn UserRepository>,
}

impl UserSubscriptionSync {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Returns the number of users updated.
    pub async fn sync(
        &self,
        email: &str,
        attrs: &SubscriptionAttributes,
    ) -> Result<u64, WebhookError> {
        if email.is_empty() {
            debug!("No billing email on event; user sync skipped");
            return Ok(0);
        }

        let updated = self
            .users
            .update_subscription_by_email(email, attrs)
            .await
            .map_err(|e| WebhookError::downstream(PipelineStep::UserSync, e))?;

        if updated == 0 {
            info!(email = %email, "No user matches billing email");
        } else {
            info!(
                email = %email,
                users = updated,
                plan = %attrs.plan,
                status = %attrs.status,
                "User subscriptions synced"
            );
        }
        Ok(updated)
    }
}
