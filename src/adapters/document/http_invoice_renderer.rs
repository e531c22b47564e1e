//! HTTP client for the PDF rendering service.
//!
//! Posts the invoice data as JSON and expects `application/pdf` bytes back.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::domain::billing::InvoiceObject;
use crate::domain::foundation::AccountId;
use crate::ports::{InvoiceRenderer, RenderError};

pub struct HttpInvoiceRenderer {
    client: Client,
    endpoint: String,
}

impl HttpInvoiceRenderer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    account_id: &'a str,
    invoice: &'a InvoiceObject,
}

#[async_trait]
impl InvoiceRenderer for HttpInvoiceRenderer {
    async fn render(
        &self,
        invoice: &InvoiceObject,
        account_id: &AccountId,
    ) -> Result<Vec<u8>, RenderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/pdf")
            .json(&RenderRequest {
                account_id: account_id.as_str(),
                invoice,
            })
            .send()
            .await
            .map_err(|e| RenderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(RenderError::Rejected(format!("{}: {}", status, body)));
        }
        if !status.is_success() {
            return Err(RenderError::Unavailable(format!("renderer returned {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RenderError::Unavailable(e.to_string()))?;
        if bytes.is_empty() {
            return Err(RenderError::EmptyDocument);
        }
        Ok(bytes.to_vec())
    }
}
