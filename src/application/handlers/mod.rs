//! Application handlers.
//!
//! Command handlers and components that orchestrate domain operations.

pub mod billing;

pub use billing::{
    // Commands
    HandleBillingWebhookCommand, HandleBillingWebhookHandler, WebhookAck,
    ReplayFailedStepsCommand, ReplayFailedStepsHandler, ReplaySummary, DEFAULT_REPLAY_LIMIT,
    // Components
    AccountReconciler, BillingEventProcessor, EventAuditLog, InvoicePipeline,
    UserSubscriptionSync,
};
