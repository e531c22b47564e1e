//! HTTP adapter for billing webhooks.
//!
//! - `POST /api/webhooks/stripe` - Handle Stripe webhooks
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{BillingAppState, WebhookApiError, SIGNATURE_HEADER};
pub use routes::{billing_router, billing_routes};
