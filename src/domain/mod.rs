//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `billing` - Plan tiers, provider events, accounts, users, invoices, dead letters

pub mod billing;
pub mod foundation;
