//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Provider and Side-Effect Ports
//!
//! - `PaymentProvider` - Webhook authentication and subscription lookup
//! - `InvoiceRenderer` - PDF generation
//! - `ObjectStorage` - Document upload
//! - `Mailer` - Customer notification
//!
//! ## Store Ports
//!
//! - `AccountRepository`, `UserRepository`, `InvoiceRepository`
//! - `EventLogRepository` - Best-effort audit snapshots
//! - `DeadLetterRepository` - Durable failed-step log for replay

mod account_repository;
mod dead_letter_repository;
mod event_log_repository;
mod invoice_renderer;
mod invoice_repository;
mod mailer;
mod object_storage;
mod payment_provider;
mod user_repository;

pub use account_repository::AccountRepository;
pub use dead_letter_repository::DeadLetterRepository;
pub use event_log_repository::EventLogRepository;
pub use invoice_renderer::{InvoiceRenderer, RenderError};
pub use invoice_repository::InvoiceRepository;
pub use mailer::{EmailAttachment, EmailMessage, MailError, Mailer};
pub use object_storage::{validate_key, ObjectStorage, StorageError};
pub use payment_provider::{PaymentError, PaymentErrorCode, PaymentProvider};
pub use user_repository::UserRepository;
