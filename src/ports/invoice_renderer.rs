//! Invoice document rendering port.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::billing::InvoiceObject;
use crate::domain::foundation::AccountId;

/// Renders a provider invoice into a PDF document.
#[async_trait]
pub trait InvoiceRenderer: Send + Sync {
    /// Returns the PDF bytes for the invoice in the context of its account.
    async fn render(
        &self,
        invoice: &InvoiceObject,
        account_id: &AccountId,
    ) -> Result<Vec<u8>, RenderError>;
}

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("Renderer unavailable: {0}")]
    Unavailable(String),

    #[error("Renderer rejected invoice: {0}")]
    Rejected(String),

    #[error("Renderer returned an empty document")]
    EmptyDocument,
}
