//! Payment configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::billing::{PlanTier, PriceMappings};

/// Payment configuration (Stripe).
///
/// Keys may be left empty. The webhook endpoint then rejects every delivery
/// as unconfigured instead of the process refusing to start.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    #[serde(default)]
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    #[serde(default)]
    pub stripe_webhook_secret: String,

    /// Comma-separated price ids for the FREE tier
    #[serde(default)]
    pub free_price_ids: String,

    /// Comma-separated price ids for the PRO tier
    #[serde(default)]
    pub pro_price_ids: String,

    /// Comma-separated price ids for the ENTERPRISE tier
    #[serde(default)]
    pub enterprise_price_ids: String,

    /// Price id billed per seat; its line item quantity is the seat count
    pub seat_price_id: Option<String>,

    /// Replay window for signed timestamps
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,

    /// Reject test-mode events
    #[serde(default)]
    pub require_livemode: bool,

    /// Stripe REST base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl PaymentConfig {
    /// Both the API key and the signing secret are present.
    pub fn is_configured(&self) -> bool {
        !self.stripe_api_key.trim().is_empty() && !self.stripe_webhook_secret.trim().is_empty()
    }

    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    /// Immutable price-id to tier table for the plan resolver.
    pub fn price_mappings(&self) -> PriceMappings {
        let mut mappings = PriceMappings::new()
            .with_prices(PlanTier::Free, split_ids(&self.free_price_ids))
            .with_prices(PlanTier::Pro, split_ids(&self.pro_price_ids))
            .with_prices(PlanTier::Enterprise, split_ids(&self.enterprise_price_ids));
        if let Some(seat) = self.seat_price_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            mappings = mappings.with_seat_price(seat);
        }
        mappings
    }

    /// Validate payment configuration. Empty keys are allowed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.stripe_api_key.is_empty() && !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.is_empty()
            && !self.stripe_webhook_secret.starts_with("whsec_")
        {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if !(1..=3600).contains(&self.webhook_tolerance_secs) {
            return Err(ValidationError::InvalidWebhookTolerance);
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidUrl("payment.api_base_url"));
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            free_price_ids: String::new(),
            pro_price_ids: String::new(),
            enterprise_price_ids: String::new(),
            seat_price_id: None,
            webhook_tolerance_secs: default_webhook_tolerance(),
            require_livemode: false,
            api_base_url: default_api_base_url(),
        }
    }
}

fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_webhook_tolerance() -> i64 {
    300
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}
