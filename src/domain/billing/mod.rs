//! Billing domain - plan tiers, provider events and reconciliation targets.

mod account;
mod event_log;
mod failed_step;
mod invoice;
mod plan_resolver;
mod plan_tier;
mod stripe_event;
mod stripe_objects;
mod user;
mod webhook_errors;
mod webhook_verifier;

pub use account::{Account, AccountUpdate, SubscriptionRef};
pub use event_log::EventLogEntry;
pub use failed_step::{FailedStep, FailedStepStatus, PipelineStep, StepFailure};
pub use invoice::{invoice_storage_key, Invoice, UpsertOutcome};
pub use plan_resolver::{PlanResolver, PriceMappings};
pub use plan_tier::PlanTier;
pub use stripe_event::{StripeEvent, StripeEventData, StripeEventType};
pub use stripe_objects::{
    CheckoutSessionObject, CustomerDetails, InvoiceObject, LineItem, ListObject, PriceRef,
    SubscriptionItem, SubscriptionObject, METADATA_ACCOUNT_ID, METADATA_CUSTOMER_EMAIL, METADATA_PRICE_ID,
};
pub use user::{SubscriptionAttributes, User};
pub use webhook_errors::{ErrorClass, WebhookError};
pub use webhook_verifier::{
    signature_header, SignatureHeader, StripeWebhookVerifier, DEFAULT_TOLERANCE_SECS,
};

#[cfg(test)]
pub use stripe_event::StripeEventBuilder;
