//! In-memory invoice store with upsert-by-external-id semantics.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{Invoice, UpsertOutcome};
use crate::domain::foundation::DomainError;
use crate::ports::InvoiceRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryInvoiceRepository {
    invoices: Arc<RwLock<HashMap<String, Invoice>>>,
    fail_upserts: Arc<RwLock<bool>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Invoice> {
        self.invoices.read().await.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.invoices.read().await.len()
    }

    /// Makes subsequent upserts fail with a database error.
    pub async fn set_failing(&self, failing: bool) {
        *self.fail_upserts.write().await = failing;
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn upsert(&self, invoice: &Invoice) -> Result<UpsertOutcome, DomainError> {
        if *self.fail_upserts.read().await {
            return Err(DomainError::database("invoice store unavailable"));
        }

        let mut invoices = self.invoices.write().await;
        match invoices.get_mut(&invoice.stripe_invoice_id) {
            Some(stored) => {
                let pdf_url = invoice.pdf_url.clone().or_else(|| stored.pdf_url.clone());
                *stored = Invoice {
                    id: stored.id,
                    created_at: stored.created_at,
                    pdf_url,
                    ..invoice.clone()
                };
                Ok(UpsertOutcome::Updated)
            }
            None => {
                invoices.insert(invoice.stripe_invoice_id.clone(), invoice.clone());
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn find_by_stripe_invoice_id(
        &self,
        stripe_invoice_id: &str,
    ) -> Result<Option<Invoice>, DomainError> {
        Ok(self.invoices.read().await.get(stripe_invoice_id).cloned())
    }
}
