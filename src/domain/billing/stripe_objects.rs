//! Stripe objects carried in `data.object` of the events we route.
//!
//! Everything beyond an id is optional: the provider omits fields freely
//! across API versions and test fixtures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key carrying the internal account id.
pub const METADATA_ACCOUNT_ID: &str = "accountId";
/// Metadata key carrying the purchased price id on checkout sessions.
pub const METADATA_PRICE_ID: &str = "priceId";
/// Metadata key carrying the billing email on subscriptions.
pub const METADATA_CUSTOMER_EMAIL: &str = "customerEmail";

/// Stripe Checkout Session object.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CheckoutSessionObject {
    /// Unique session identifier (cs_...).
    pub id: String,

    /// Customer ID if customer was created/attached.
    #[serde(default)]
    pub customer: Option<String>,

    /// Customer email used during checkout.
    #[serde(default)]
    pub customer_email: Option<String>,

    /// Details the customer entered on the checkout page.
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,

    /// Subscription ID if checkout created a subscription.
    #[serde(default)]
    pub subscription: Option<String>,

    /// Custom metadata attached to the session.
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Line items, present only when expanded.
    #[serde(default)]
    pub line_items: Option<ListObject<LineItem>>,
}

impl CheckoutSessionObject {
    pub fn account_id(&self) -> Option<&str> {
        metadata_value(&self.metadata, METADATA_ACCOUNT_ID)
    }

    /// Billing email: the prefilled `customer_email`, else the one entered
    /// on the checkout page.
    pub fn billing_email(&self) -> Option<&str> {
        non_blank(self.customer_email.as_deref()).or_else(|| {
            self.customer_details
                .as_ref()
                .and_then(|details| non_blank(details.email.as_deref()))
        })
    }

    /// Price id from metadata, falling back to the first expanded line item.
    pub fn price_id(&self) -> Option<&str> {
        metadata_value(&self.metadata, METADATA_PRICE_ID).or_else(|| {
            self.line_items
                .as_ref()
                .and_then(|items| items.data.first())
                .and_then(|item| item.price.as_ref())
                .map(|price| price.id.as_str())
        })
    }
}

/// Customer details collected by Checkout.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Stripe Subscription object.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionObject {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    /// Customer ID owning this subscription.
    #[serde(default)]
    pub customer: Option<String>,

    /// Subscription status (active, past_due, canceled, ...).
    #[serde(default)]
    pub status: Option<String>,

    /// Current period end (Unix timestamp).
    #[serde(default)]
    pub current_period_end: Option<i64>,

    /// Custom metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Subscription items (price/quantity pairs).
    #[serde(default)]
    pub items: ListObject<SubscriptionItem>,
}

impl SubscriptionObject {
    pub fn account_id(&self) -> Option<&str> {
        metadata_value(&self.metadata, METADATA_ACCOUNT_ID)
    }

    pub fn customer_email(&self) -> Option<&str> {
        metadata_value(&self.metadata, METADATA_CUSTOMER_EMAIL)
    }

    /// Price ids of all items, in payload order.
    pub fn price_ids(&self) -> impl Iterator<Item = &str> {
        self.items
            .data
            .iter()
            .filter_map(|item| item.price.as_ref().map(|p| p.id.as_str()))
    }

    /// Quantity of the first item billed at `price_id`.
    pub fn quantity_for_price(&self, price_id: &str) -> Option<i64> {
        self.items
            .data
            .iter()
            .find(|item| item.price.as_ref().map(|p| p.id.as_str()) == Some(price_id))
            .map(|item| item.quantity)
    }
}

/// Stripe list envelope (`{"object": "list", "data": [...]}`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListObject<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Default for ListObject<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

/// Single subscription item.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub price: Option<PriceRef>,

    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

/// Single checkout line item.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LineItem {
    #[serde(default)]
    pub price: Option<PriceRef>,

    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Price reference embedded in items.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PriceRef {
    pub id: String,
}

/// Stripe Invoice object.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InvoiceObject {
    /// Unique invoice identifier (in_...).
    pub id: String,

    /// Human-facing invoice number, assigned on finalization.
    #[serde(default)]
    pub number: Option<String>,

    #[serde(default)]
    pub customer: Option<String>,

    #[serde(default)]
    pub customer_email: Option<String>,

    #[serde(default)]
    pub customer_name: Option<String>,

    /// Associated subscription ID.
    #[serde(default)]
    pub subscription: Option<String>,

    /// Amount due in the smallest currency unit.
    #[serde(default)]
    pub amount_due: i64,

    /// Currency (lowercase).
    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub period_start: Option<i64>,

    #[serde(default)]
    pub period_end: Option<i64>,

    /// Custom metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl InvoiceObject {
    pub fn account_id(&self) -> Option<&str> {
        metadata_value(&self.metadata, METADATA_ACCOUNT_ID)
    }
}

fn metadata_value<'a>(metadata: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    non_blank(metadata.get(key).map(String::as_str))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
