//! Deterministic invoice renderer for tests and local development.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::InvoiceObject;
use crate::domain::foundation::AccountId;
use crate::ports::{InvoiceRenderer, RenderError};

/// Produces a small placeholder PDF naming the invoice and account.
#[derive(Debug, Clone, Default)]
pub struct MockInvoiceRenderer {
    fail_renders: Arc<RwLock<bool>>,
    calls: Arc<RwLock<u32>>,
}

impl MockInvoiceRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.fail_renders.write().await = failing;
    }

    pub async fn calls(&self) -> u32 {
        *self.calls.read().await
    }
}

#[async_trait]
impl InvoiceRenderer for MockInvoiceRenderer {
    async fn render(
        &self,
        invoice: &InvoiceObject,
        account_id: &AccountId,
    ) -> Result<Vec<u8>, RenderError> {
        *self.calls.write().await += 1;
        if *self.fail_renders.read().await {
            return Err(RenderError::Unavailable("renderer offline".to_string()));
        }
        Ok(format!("%PDF-1.7\n% invoice {} for {}\n%%EOF\n", invoice.id, account_id).into_bytes())
    }
}
