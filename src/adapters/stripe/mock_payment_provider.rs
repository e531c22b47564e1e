//! Mock payment provider for testing.
//!
//! Verifies deliveries with the real HMAC verifier against a test secret,
//! serves pre-configured subscriptions and supports error injection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::billing::{StripeEvent, StripeWebhookVerifier, SubscriptionObject, WebhookError};
use crate::ports::{PaymentError, PaymentProvider};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new("whsec_test");
/// mock.add_subscription(subscription);
/// mock.fail_fetch(PaymentError::network("down"));
/// ```
#[derive(Clone)]
pub struct MockPaymentProvider {
    verifier: Arc<StripeWebhookVerifier>,
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Pre-configured subscriptions by ID.
    subscriptions: HashMap<String, SubscriptionObject>,

    /// Error returned by every `fetch_subscription` call while set.
    fetch_error: Option<PaymentError>,

    /// Subscription ids requested, in order.
    fetch_log: Vec<String>,
}

impl MockPaymentProvider {
    /// Create a mock that accepts deliveries signed with `webhook_secret`.
    pub fn new(webhook_secret: &str) -> Self {
        Self {
            verifier: Arc::new(StripeWebhookVerifier::new(SecretString::new(
                webhook_secret.to_string(),
            ))),
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a subscription to the "database".
    pub fn add_subscription(&self, subscription: SubscriptionObject) {
        let id = subscription.id.clone();
        self.state().subscriptions.insert(id, subscription);
    }

    /// Make every subsequent fetch fail with `error`.
    pub fn fail_fetch(&self, error: PaymentError) {
        self.state().fetch_error = Some(error);
    }

    /// Clear injected fetch errors.
    pub fn clear_errors(&self) {
        self.state().fetch_error = None;
    }

    /// Subscription ids fetched so far.
    pub fn fetched(&self) -> Vec<String> {
        self.state().fetch_log.clone()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<StripeEvent, WebhookError> {
        self.verifier.verify_and_parse(payload, signature)
    }

    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionObject, PaymentError> {
        let mut state = self.state();
        state.fetch_log.push(subscription_id.to_string());

        if let Some(err) = &state.fetch_error {
            return Err(err.clone());
        }

        state
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("subscription"))
    }
}
