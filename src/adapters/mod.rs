//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `stripe` - Stripe webhook verification and subscription lookup
//! - `postgres` / `memory` - stores for accounts, users, invoices, audit and dead letters
//! - `document` - invoice PDF rendering
//! - `storage` - object storage for rendered documents
//! - `email` - outbound mail
//! - `http` - axum webhook endpoint

pub mod document;
pub mod email;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod storage;
pub mod stripe;
