//! Invoice record produced by the invoice pipeline.

use serde::{Deserialize, Serialize};

use super::stripe_objects::InvoiceObject;
use crate::domain::foundation::{AccountId, InvoiceId, Timestamp};

/// Internal record of a generated bill.
///
/// Unique per `stripe_invoice_id`; persistence is an upsert on that key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub account_id: AccountId,
    pub stripe_invoice_id: String,
    pub number: Option<String>,
    pub amount_due: i64,
    pub currency: Option<String>,
    pub period_start: Option<Timestamp>,
    pub period_end: Option<Timestamp>,
    pub pdf_url: Option<String>,
    pub created_at: Timestamp,
}

impl Invoice {
    /// Builds the record from provider data and the uploaded document URL.
    pub fn from_provider(
        account_id: AccountId,
        source: &InvoiceObject,
        pdf_url: Option<String>,
    ) -> Self {
        Self {
            id: InvoiceId::new(),
            account_id,
            stripe_invoice_id: source.id.clone(),
            number: source.number.clone(),
            amount_due: source.amount_due,
            currency: source.currency.clone(),
            period_start: source.period_start.and_then(Timestamp::from_unix_secs),
            period_end: source.period_end.and_then(Timestamp::from_unix_secs),
            pdf_url: pdf_url.filter(|url| !url.is_empty()),
            created_at: Timestamp::now(),
        }
    }
}

/// Deterministic object-storage key for an invoice document.
///
/// `invoices/{account_id}/{number or invoice id}.pdf`. Path separators in
/// either segment are replaced so the key stays two levels deep.
pub fn invoice_storage_key(account_id: &AccountId, source: &InvoiceObject) -> String {
    let name = source
        .number
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(&source.id);
    format!(
        "invoices/{}/{}.pdf",
        sanitize_segment(account_id.as_str()),
        sanitize_segment(name)
    )
}

fn sanitize_segment(segment: &str) -> String {
    segment
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

/// Outcome of an invoice upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(number: Option<&str>) -> InvoiceObject {
        InvoiceObject {
            id: "in_123".into(),
            number: number.map(String::from),
            amount_due: 4900,
            currency: Some("usd".into()),
            period_start: Some(1_700_000_000),
            period_end: Some(1_702_592_000),
            ..InvoiceObject::default()
        }
    }

    #[test]
    fn storage_key_prefers_invoice_number() {
        let acc = AccountId::new("acc_1").unwrap();
        assert_eq!(
            invoice_storage_key(&acc, &source(Some("INV-0001"))),
            "invoices/acc_1/INV-0001.pdf"
        );
    }

    #[test]
    fn storage_key_falls_back_to_invoice_id() {
        let acc = AccountId::new("acc_1").unwrap();
        assert_eq!(invoice_storage_key(&acc, &source(None)), "invoices/acc_1/in_123.pdf");
        assert_eq!(invoice_storage_key(&acc, &source(Some(" "))), "invoices/acc_1/in_123.pdf");
    }

    #[test]
    fn storage_key_strips_separators() {
        let acc = AccountId::new("acc_1").unwrap();
        assert_eq!(
            invoice_storage_key(&acc, &source(Some("2024/01"))),
            "invoices/acc_1/2024_01.pdf"
        );
    }

    #[test]
    fn from_provider_copies_amounts_and_periods() {
        let acc = AccountId::new("acc_1").unwrap();
        let invoice = Invoice::from_provider(acc, &source(Some("INV-1")), None);
        assert_eq!(invoice.stripe_invoice_id, "in_123");
        assert_eq!(invoice.amount_due, 4900);
        assert_eq!(invoice.period_start.map(|t| t.as_unix_secs()), Some(1_700_000_000));
        assert!(invoice.pdf_url.is_none());
    }

    #[test]
    fn empty_pdf_url_is_treated_as_missing() {
        let acc = AccountId::new("acc_1").unwrap();
        let invoice = Invoice::from_provider(acc, &source(None), Some(String::new()));
        assert!(invoice.pdf_url.is_none());
    }
}
