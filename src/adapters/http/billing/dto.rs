//! HTTP DTOs for the billing webhook endpoint.

use serde::Serialize;

use crate::application::handlers::billing::{BranchReport, WebhookAck};

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgment body returned for every authenticated delivery.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    pub event_id: String,
    pub event_type: String,
    /// One entry per dispatched branch. Empty for unhandled event types.
    pub branches: Vec<BranchReport>,
}

impl From<WebhookAck> for WebhookAckResponse {
    fn from(ack: WebhookAck) -> Self {
        Self {
            received: true,
            event_id: ack.event_id,
            event_type: ack.event_type,
            branches: ack.branches,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Standard error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ack_response_always_reports_received() {
        let response = WebhookAckResponse::from(WebhookAck {
            event_id: "evt_1".to_string(),
            event_type: "charge.refunded".to_string(),
            branches: vec![],
        });

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "received": true,
                "event_id": "evt_1",
                "event_type": "charge.refunded",
                "branches": []
            })
        );
    }

    #[test]
    fn error_response_serializes_code_and_message() {
        let response = ErrorResponse::new("MISSING_SIGNATURE", "Missing signature header");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["error_code"], "MISSING_SIGNATURE");
        assert_eq!(value["message"], "Missing signature header");
    }
}
