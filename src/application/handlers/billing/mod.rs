//! Billing handlers.
//!
//! Components that reconcile internal state with payment-provider events:
//!
//! ## Components
//! - `AccountReconciler` - plan, seats and provider references on accounts
//! - `UserSubscriptionSync` - subscription attributes on users, by email
//! - `InvoicePipeline` - render, upload, persist and email invoices
//! - `EventAuditLog` - best-effort raw event snapshots
//!
//! ## Commands
//! - Handling a provider webhook (the event router)
//! - Replaying dead-lettered steps

mod handle_billing_webhook;
mod invoice_pipeline;
mod process_billing_event;
mod reconcile_account;
mod record_event;
mod replay_failed_steps;
mod step_guard;
mod sync_user_subscription;

// Commands
pub use handle_billing_webhook::{
    HandleBillingWebhookCommand, HandleBillingWebhookHandler, WebhookAck,
};
pub use replay_failed_steps::{
    ReplayFailedStepsCommand, ReplayFailedStepsHandler, ReplaySummary, DEFAULT_REPLAY_LIMIT,
};

// Components
pub use invoice_pipeline::{InvoiceOutcome, InvoicePipeline, InvoiceReport, PipelineMode};
pub use process_billing_event::{BillingEventProcessor, Branch, BranchOutcome, BranchReport};
pub use reconcile_account::{AccountReconciler, ReconcileOutcome};
pub use record_event::EventAuditLog;
pub use step_guard::DEFAULT_STEP_TIMEOUT;
pub use sync_user_subscription::UserSubscriptionSync;
