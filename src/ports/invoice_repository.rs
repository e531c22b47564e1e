//! Invoice repository port.

use async_trait::async_trait;

use crate::domain::billing::{Invoice, UpsertOutcome};
use crate::domain::foundation::DomainError;

/// Persistence for invoice records, unique per external invoice id.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Inserts or updates the record keyed by `stripe_invoice_id`.
    ///
    /// An update never replaces a stored `pdf_url` with `None`, and keeps
    /// the original internal id and creation time.
    async fn upsert(&self, invoice: &Invoice) -> Result<UpsertOutcome, DomainError>;

    async fn find_by_stripe_invoice_id(
        &self,
        stripe_invoice_id: &str,
    ) -> Result<Option<Invoice>, DomainError>;
}
