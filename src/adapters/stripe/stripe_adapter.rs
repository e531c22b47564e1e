//! Stripe payment provider adapter.
//!
//! Authenticates webhook deliveries with the signing secret and reads
//! subscriptions over the Stripe REST API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key, webhook_secret);
//! let adapter = StripePaymentAdapter::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::billing::{
    StripeEvent, StripeWebhookVerifier, SubscriptionObject, WebhookError, DEFAULT_TOLERANCE_SECS,
};
use crate::ports::{PaymentError, PaymentErrorCode, PaymentProvider};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Replay window for signed timestamps.
    tolerance_secs: i64,

    /// Whether to reject test-mode events.
    require_livemode: bool,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            api_key,
            webhook_secret,
            api_base_url: "https://api.stripe.com".to_string(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            require_livemode: false,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Require livemode events in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    verifier: StripeWebhookVerifier,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        let verifier = StripeWebhookVerifier::new(config.webhook_secret.clone())
            .with_tolerance(config.tolerance_secs);
        Self {
            config,
            verifier,
            http_client: reqwest::Client::new(),
        }
    }
}

/// Stripe error envelope (`{"error": {"type", "code", "message"}}`).
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn error_for_status(status: reqwest::StatusCode, body: &str) -> PaymentError {
    let detail = serde_json::from_str::<StripeErrorBody>(body).ok().map(|b| b.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("Stripe API error ({})", status));

    let code = match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            PaymentErrorCode::AuthenticationError
        }
        reqwest::StatusCode::NOT_FOUND => PaymentErrorCode::NotFound,
        reqwest::StatusCode::TOO_MANY_REQUESTS => PaymentErrorCode::RateLimitExceeded,
        s if s.is_server_error() => PaymentErrorCode::NetworkError,
        _ => PaymentErrorCode::ProviderError,
    };

    let err = PaymentError::new(code, message);
    match detail.and_then(|d| d.code) {
        Some(provider_code) => err.with_provider_code(provider_code),
        None => err,
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<StripeEvent, WebhookError> {
        let event = self.verifier.verify_and_parse(payload, signature).map_err(|e| {
            tracing::warn!(error = %e, "Stripe webhook verification failed");
            e
        })?;

        if self.config.require_livemode && !event.is_live() {
            tracing::warn!(event_id = %event.id, "Rejecting test-mode event");
            return Err(WebhookError::InvalidPayload(
                "test-mode event not accepted".to_string(),
            ));
        }

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Webhook signature verified"
        );

        Ok(event)
    }

    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionObject, PaymentError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }

        response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::signature_header;

    fn secret(s: &str) -> SecretString {
        SecretString::new(s.to_string())
    }

    fn test_config() -> StripeConfig {
        StripeConfig::new(secret("sk_test_key"), secret("whsec_test_secret"))
    }

    #[test]
    fn config_new_sets_defaults() {
        let config = test_config();
        assert_eq!(config.api_base_url, "https://api.stripe.com");
        assert_eq!(config.tolerance_secs, 300);
        assert!(!config.require_livemode);
    }

    #[test]
    fn config_with_base_url_trims_trailing_slash() {
        let config = test_config().with_base_url("http://localhost:12111/");
        assert_eq!(config.api_base_url, "http://localhost:12111");
    }

    #[test]
    fn error_for_status_maps_codes() {
        let body = r#"{"error":{"type":"invalid_request_error","code":"resource_missing","message":"No such subscription: 'sub_x'"}}"#;
        let err = error_for_status(reqwest::StatusCode::NOT_FOUND, body);
        assert_eq!(err.code, PaymentErrorCode::NotFound);
        assert_eq!(err.provider_code.as_deref(), Some("resource_missing"));
        assert!(err.message.contains("sub_x"));

        let err = error_for_status(reqwest::StatusCode::BAD_GATEWAY, "upstream");
        assert_eq!(err.code, PaymentErrorCode::NetworkError);
        assert!(err.retryable);
    }

    #[tokio::test]
    async fn verify_webhook_valid_signature_and_payload() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = br#"{"id":"evt_test123","type":"checkout.session.completed","created":1704067200,"data":{"object":{"id":"cs_test"}},"livemode":false}"#;
        let header = signature_header("whsec_test_secret", chrono::Utc::now().timestamp(), payload);

        let event = adapter.verify_webhook(payload, &header).await.unwrap();

        assert_eq!(event.id, "evt_test123");
    }

    #[tokio::test]
    async fn verify_webhook_rejects_invalid_signature() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = br#"{"id":"evt_1","type":"x","data":{"object":{}}}"#;
        let header = signature_header("whsec_other", chrono::Utc::now().timestamp(), payload);

        let result = adapter.verify_webhook(payload, &header).await;

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[tokio::test]
    async fn verify_webhook_rejects_test_mode_when_live_required() {
        let adapter = StripePaymentAdapter::new(test_config().with_require_livemode(true));
        let payload = br#"{"id":"evt_1","type":"x","data":{"object":{}},"livemode":false}"#;
        let header = signature_header("whsec_test_secret", chrono::Utc::now().timestamp(), payload);

        let result = adapter.verify_webhook(payload, &header).await;

        assert!(matches!(result, Err(WebhookError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn fetch_subscription_reports_network_failure() {
        // Port 9 (discard) on localhost is not listening
        let adapter = StripePaymentAdapter::new(test_config().with_base_url("http://127.0.0.1:9"));

        let err = adapter.fetch_subscription("sub_1").await.unwrap_err();

        assert_eq!(err.code, PaymentErrorCode::NetworkError);
    }
}
