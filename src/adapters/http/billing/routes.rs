//! Axum router for the billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{handle_stripe_webhook, health, BillingAppState};

/// Create the billing router.
///
/// # Routes
/// - `POST /api/webhooks/stripe` - Stripe webhook deliveries (other methods get 405)
/// - `GET /health` - Liveness probe
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/api/webhooks/stripe", post(handle_stripe_webhook))
        .route("/health", get(health))
}

/// Router with state applied, ready to serve or to wrap in layers.
pub fn billing_router(state: BillingAppState) -> Router {
    billing_routes().with_state(state)
}
