//! In-memory store adapters.
//!
//! Used by tests and by the server when no database URL is configured.

mod account_repository;
mod dead_letter_repository;
mod event_log_repository;
mod invoice_repository;
mod user_repository;

pub use account_repository::InMemoryAccountRepository;
pub use dead_letter_repository::InMemoryDeadLetterRepository;
pub use event_log_repository::InMemoryEventLogRepository;
pub use invoice_repository::InMemoryInvoiceRepository;
pub use user_repository::InMemoryUserRepository;
