//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers depend only on port traits; adapters are injected at startup.

pub mod handlers;

pub use handlers::{
    HandleBillingWebhookCommand, HandleBillingWebhookHandler, ReplayFailedStepsCommand,
    ReplayFailedStepsHandler, ReplaySummary, WebhookAck, DEFAULT_REPLAY_LIMIT,
};
