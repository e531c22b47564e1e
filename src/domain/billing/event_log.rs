//! Append-only audit snapshot of a processed provider event.

use serde::{Deserialize, Serialize};

use super::stripe_event::StripeEvent;
use crate::domain::foundation::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub event_id: String,
    pub event_type: String,
    /// Full payload snapshot as received.
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}

impl EventLogEntry {
    pub fn from_event(event: &StripeEvent) -> Self {
        Self {
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            payload: event.raw().clone(),
            created_at: Timestamp::now(),
        }
    }
}
