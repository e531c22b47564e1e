//! Billing Reconciler - payment-provider webhook reconciliation.
//!
//! Verifies signed Stripe deliveries and reconciles their effects into
//! internal state: account plans and seats, per-user subscription
//! attributes, and rendered, stored and emailed invoices. Each event type
//! runs in its own isolated branch; failed downstream steps are recorded in
//! a dead-letter log and can be replayed.

pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod ports;
