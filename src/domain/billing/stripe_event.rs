//! Stripe webhook event envelope.
//!
//! Only the fields routing needs are typed. The full payload is kept
//! alongside so it can be snapshotted to the audit log and dead letters.

use serde::{Deserialize, Serialize};

/// Stripe webhook event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    #[serde(default)]
    pub created: i64,

    /// Object containing event-specific data.
    pub data: StripeEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,

    /// API version used to render this event.
    #[serde(default)]
    pub api_version: Option<String>,

    /// Payload exactly as parsed from the wire.
    #[serde(skip)]
    raw: serde_json::Value,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,

    /// Previous values for updated attributes (only for update events).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

impl StripeEvent {
    /// Parses an event from verified payload bytes, retaining the raw snapshot.
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: serde_json::Value = serde_json::from_slice(payload)?;
        Self::from_value(raw)
    }

    /// Parses an event from a stored snapshot.
    pub fn from_value(raw: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut event: StripeEvent = serde_json::from_value(raw.clone())?;
        event.raw = raw;
        Ok(event)
    }

    /// Full payload snapshot.
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    /// Returns true if this is a live mode event.
    pub fn is_live(&self) -> bool {
        self.livemode
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }

    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::parse(&self.event_type)
    }
}

/// Known Stripe event types that we handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    /// Checkout session completed successfully.
    CheckoutSessionCompleted,
    /// Customer subscription was created.
    CustomerSubscriptionCreated,
    /// Customer subscription was updated.
    CustomerSubscriptionUpdated,
    /// Customer subscription was deleted.
    CustomerSubscriptionDeleted,
    /// Invoice was finalized and is ready to be billed.
    InvoiceFinalized,
    /// Unknown or unhandled event type.
    Unknown,
}

impl StripeEventType {
    /// Parse event type from string.
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.created" => Self::CustomerSubscriptionCreated,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            "invoice.finalized" => Self::InvoiceFinalized,
            _ => Self::Unknown,
        }
    }

    /// Convert to the Stripe event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CustomerSubscriptionCreated => "customer.subscription.created",
            Self::CustomerSubscriptionUpdated => "customer.subscription.updated",
            Self::CustomerSubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoiceFinalized => "invoice.finalized",
            Self::Unknown => "unknown",
        }
    }
}

/// Builder for creating test StripeEvent instances.
#[cfg(test)]
pub struct StripeEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
}

#[cfg(test)]
impl Default for StripeEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
        }
    }
}

#[cfg(test)]
impl StripeEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "type": self.event_type,
            "created": self.created,
            "data": { "object": self.object },
            "livemode": false,
            "api_version": "2023-10-16"
        })
    }

    pub fn build(self) -> StripeEvent {
        match StripeEvent::from_value(self.to_json()) {
            Ok(event) => event,
            Err(e) => panic!("test event must parse: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_minimal_event() {
        let json = br#"{
            "id": "evt_1234567890",
            "type": "checkout.session.completed",
            "created": 1704067200,
            "data": { "object": { "id": "cs_test_123" } },
            "livemode": false,
            "api_version": "2023-10-16"
        }"#;

        let event = StripeEvent::from_slice(json).unwrap();

        assert_eq!(event.id, "evt_1234567890");
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.created, 1704067200);
        assert!(!event.is_live());
        assert_eq!(event.api_version.as_deref(), Some("2023-10-16"));
    }

    #[test]
    fn raw_snapshot_keeps_unknown_fields() {
        let json = br#"{
            "id": "evt_1",
            "type": "invoice.finalized",
            "data": { "object": { "id": "in_1" } },
            "pending_webhooks": 2,
            "request": { "id": "req_1" }
        }"#;

        let event = StripeEvent::from_slice(json).unwrap();

        assert_eq!(event.raw()["pending_webhooks"], json!(2));
        assert_eq!(event.raw()["request"]["id"], json!("req_1"));
    }

    #[test]
    fn missing_type_fails_to_parse() {
        let result = StripeEvent::from_slice(br#"{"id":"evt_1","data":{"object":{}}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn from_value_roundtrips_snapshot() {
        let event = StripeEventBuilder::new().id("evt_snap").build();
        let restored = StripeEvent::from_value(event.raw().clone()).unwrap();
        assert_eq!(restored.id, "evt_snap");
        assert_eq!(restored.raw(), event.raw());
    }

    #[test]
    fn parsed_type_maps_known_strings() {
        for ty in [
            StripeEventType::CheckoutSessionCompleted,
            StripeEventType::CustomerSubscriptionCreated,
            StripeEventType::CustomerSubscriptionUpdated,
            StripeEventType::CustomerSubscriptionDeleted,
            StripeEventType::InvoiceFinalized,
        ] {
            assert_eq!(StripeEventType::parse(ty.as_str()), ty);
        }
        assert_eq!(
            StripeEventType::parse("invoice.payment_succeeded"),
            StripeEventType::Unknown
        );
    }

    #[test]
    fn deserialize_object_into_typed_struct() {
        #[derive(Deserialize)]
        struct Obj {
            id: String,
        }
        let event = StripeEventBuilder::new().object(json!({"id": "cs_1"})).build();
        let obj: Obj = event.deserialize_object().unwrap();
        assert_eq!(obj.id, "cs_1");
    }
}
