//! InvoicePipeline - render, upload, record, persist and email a finalized
//! invoice.
//!
//! Step order and gating:
//!
//! 1. Resolve the owning account (explicit metadata, else stored
//!    subscription id). No account means nothing to do.
//! 2. Render the PDF. The only fatal step: without content there is
//!    nothing to upload, persist or email.
//! 3. Upload to object storage. On failure the pipeline continues without
//!    a document URL.
//! 4. Append the raw event to the audit log (best-effort).
//! 5. Upsert the Invoice record keyed by the provider invoice id.
//! 6. Email the customer with the PDF attached.
//!
//! Steps 3 to 6 are attempted regardless of each other's outcome. Every
//! failure is returned in the report for dead-lettering.
//!
//! A live delivery for an invoice that already has a record is a provider
//! redelivery and is skipped whole. Whatever the first run missed is left
//! to dead-letter replay, so the customer is emailed at most once.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::record_event::EventAuditLog;
use super::step_guard::{bounded, step_failure, DEFAULT_STEP_TIMEOUT};
use crate::domain::billing::{
    invoice_storage_key, Invoice, InvoiceObject, PipelineStep, StepFailure, StripeEvent,
    WebhookError,
};
use crate::domain::foundation::AccountId;
use crate::ports::{
    AccountRepository, EmailAttachment, EmailMessage, InvoiceRenderer, InvoiceRepository, Mailer,
    ObjectStorage,
};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// How the pipeline is being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// Delivery from the provider. Skips invoices that already have a record.
    Live,
    /// Re-run of a dead-lettered step. Always runs; emails only when asked.
    Replay { send_email: bool },
}

impl PipelineMode {
    fn sends_email(self) -> bool {
        match self {
            PipelineMode::Live => true,
            PipelineMode::Replay { send_email } => send_email,
        }
    }
}

/// Where the pipeline ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum InvoiceOutcome {
    /// No internal account owns the invoice.
    NoAccount,
    /// A record already exists for this invoice.
    AlreadyRecorded,
    /// Account lookup or rendering failed; nothing was produced.
    Aborted,
    /// Rendering succeeded and the remaining steps were attempted.
    Processed {
        account_id: AccountId,
        pdf_url: Option<String>,
        persisted: bool,
        emailed: bool,
    },
}

/// Outcome plus every step that failed along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceReport {
    pub outcome: InvoiceOutcome,
    pub failures: Vec<StepFailure>,
}

impl InvoiceReport {
    fn new(outcome: InvoiceOutcome, failures: Vec<StepFailure>) -> Self {
        Self { outcome, failures }
    }
}

/// Orchestrates the invoice delivery steps.
#[derive(Clone)]
pub struct InvoicePipeline {
    accounts: Arc<dyn AccountRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    renderer: Arc<dyn InvoiceRenderer>,
    storage: Arc<dyn ObjectStorage>,
    mailer: Arc<dyn Mailer>,
    audit: EventAuditLog,
    step_timeout: Duration,
}

impl InvoicePipeline {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        renderer: Arc<dyn InvoiceRenderer>,
        storage: Arc<dyn ObjectStorage>,
        mailer: Arc<dyn Mailer>,
        audit: EventAuditLog,
    ) -> Self {
        Self {
            accounts,
            invoices,
            renderer,
            storage,
            mailer,
            audit,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    pub async fn run(
        &self,
        event: &StripeEvent,
        invoice: &InvoiceObject,
        mode: PipelineMode,
    ) -> InvoiceReport {
        let mut failures = Vec::new();

        let account_id = match self.resolve_account(invoice).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                info!(
                    event_id = %event.id,
                    stripe_invoice_id = %invoice.id,
                    subscription_id = ?invoice.subscription,
                    "No account owns invoice; pipeline skipped"
                );
                return InvoiceReport::new(InvoiceOutcome::NoAccount, failures);
            }
            Err(e) => {
                error!(event_id = %event.id, stripe_invoice_id = %invoice.id, error = %e, "Invoice account lookup failed");
                failures.push(step_failure(&e, PipelineStep::InvoiceResolve));
                return InvoiceReport::new(InvoiceOutcome::Aborted, failures);
            }
        };

        if mode == PipelineMode::Live && self.already_recorded(invoice).await {
            info!(
                event_id = %event.id,
                stripe_invoice_id = %invoice.id,
                "Invoice already recorded; duplicate delivery skipped"
            );
            return InvoiceReport::new(InvoiceOutcome::AlreadyRecorded, failures);
        }

        let pdf = match bounded(
            PipelineStep::InvoiceRender,
            self.step_timeout,
            self.renderer.render(invoice, &account_id),
        )
        .await
        {
            Ok(pdf) => pdf,
            Err(e) => {
                error!(
                    event_id = %event.id,
                    account_id = %account_id,
                    stripe_invoice_id = %invoice.id,
                    error = %e,
                    "Invoice render failed; remaining steps aborted"
                );
                failures.push(step_failure(&e, PipelineStep::InvoiceRender));
                return InvoiceReport::new(InvoiceOutcome::Aborted, failures);
            }
        };

        let pdf_url = match self.upload(event, &account_id, invoice, &pdf).await {
            Ok(url) => Some(url),
            Err(e) => {
                failures.push(step_failure(&e, PipelineStep::InvoiceUpload));
                None
            }
        };

        match mode {
            PipelineMode::Live => self.audit.record(event).await,
            PipelineMode::Replay { .. } => self.audit.record_once(event).await,
        };

        let record = Invoice::from_provider(account_id.clone(), invoice, pdf_url.clone());
        let persisted = match bounded(
            PipelineStep::InvoicePersist,
            self.step_timeout,
            self.invoices.upsert(&record),
        )
        .await
        {
            Ok(outcome) => {
                debug!(stripe_invoice_id = %invoice.id, outcome = ?outcome, "Invoice record stored");
                true
            }
            Err(e) => {
                warn!(
                    event_id = %event.id,
                    account_id = %account_id,
                    stripe_invoice_id = %invoice.id,
                    error = %e,
                    "Invoice persist failed; continuing to email"
                );
                failures.push(step_failure(&e, PipelineStep::InvoicePersist));
                false
            }
        };

        let emailed = if mode.sends_email() {
            match self.email(invoice, &pdf, pdf_url.as_deref()).await {
                Ok(sent) => sent,
                Err(e) => {
                    warn!(
                        event_id = %event.id,
                        stripe_invoice_id = %invoice.id,
                        error = %e,
                        "Invoice email failed"
                    );
                    failures.push(step_failure(&e, PipelineStep::InvoiceEmail));
                    false
                }
            }
        } else {
            false
        };

        info!(
            event_id = %event.id,
            account_id = %account_id,
            stripe_invoice_id = %invoice.id,
            has_pdf_url = pdf_url.is_some(),
            persisted,
            emailed,
            failures = failures.len(),
            "Invoice pipeline finished"
        );

        InvoiceReport::new(
            InvoiceOutcome::Processed {
                account_id,
                pdf_url,
                persisted,
                emailed,
            },
            failures,
        )
    }

    async fn resolve_account(
        &self,
        invoice: &InvoiceObject,
    ) -> Result<Option<AccountId>, WebhookError> {
        if let Some(id) = invoice.account_id().and_then(|id| AccountId::new(id).ok()) {
            return Ok(Some(id));
        }

        let Some(subscription_id) = invoice.subscription.as_deref().filter(|s| !s.is_empty())
        else {
            return Ok(None);
        };

        let account = bounded(
            PipelineStep::InvoiceResolve,
            self.step_timeout,
            self.accounts.find_by_subscription_id(subscription_id),
        )
        .await?;
        Ok(account.map(|a| a.id))
    }

    /// A failed lookup is not a reason to skip: the run proceeds and the
    /// upsert keeps the store consistent.
    async fn already_recorded(&self, invoice: &InvoiceObject) -> bool {
        match bounded(
            PipelineStep::InvoicePersist,
            self.step_timeout,
            self.invoices.find_by_stripe_invoice_id(&invoice.id),
        )
        .await
        {
            Ok(existing) => existing.is_some(),
            Err(e) => {
                warn!(stripe_invoice_id = %invoice.id, error = %e, "Existing invoice lookup failed; processing anyway");
                false
            }
        }
    }

    async fn upload(
        &self,
        event: &StripeEvent,
        account_id: &AccountId,
        invoice: &InvoiceObject,
        pdf: &[u8],
    ) -> Result<String, WebhookError> {
        let key = invoice_storage_key(account_id, invoice);
        let result = bounded(
            PipelineStep::InvoiceUpload,
            self.step_timeout,
            self.storage.put(&key, pdf, PDF_CONTENT_TYPE),
        )
        .await;

        match &result {
            Ok(url) => debug!(key = %key, url = %url, "Invoice document uploaded"),
            Err(e) => warn!(
                event_id = %event.id,
                account_id = %account_id,
                stripe_invoice_id = %invoice.id,
                key = %key,
                error = %e,
                "Invoice upload failed; continuing without document URL"
            ),
        }
        result
    }

    /// Returns whether a message was sent. No recipient is not a failure.
    async fn email(
        &self,
        invoice: &InvoiceObject,
        pdf: &[u8],
        pdf_url: Option<&str>,
    ) -> Result<bool, WebhookError> {
        let Some(to) = invoice
            .customer_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
        else {
            info!(stripe_invoice_id = %invoice.id, "Invoice has no customer email; notification skipped");
            return Ok(false);
        };

        let message = invoice_email(to, invoice, pdf, pdf_url);
        bounded(
            PipelineStep::InvoiceEmail,
            self.step_timeout,
            self.mailer.send(&message),
        )
        .await?;
        info!(stripe_invoice_id = %invoice.id, to = %to, "Invoice email sent");
        Ok(true)
    }
}

fn invoice_email(
    to: &str,
    invoice: &InvoiceObject,
    pdf: &[u8],
    pdf_url: Option<&str>,
) -> EmailMessage {
    let label = invoice
        .number
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(&invoice.id);
    let greeting = invoice
        .customer_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("there");

    let mut body = format!(
        "Hello {},\n\nYour invoice {} for {} is attached.\n",
        greeting,
        label,
        format_amount(invoice.amount_due, invoice.currency.as_deref())
    );
    if let Some(url) = pdf_url {
        body.push_str(&format!("You can also download it at {}\n", url));
    }

    EmailMessage {
        to: to.to_string(),
        subject: format!("Your invoice {}", label),
        body,
        attachments: vec![EmailAttachment::pdf(
            format!("{}.pdf", label.replace(['/', '\\'], "_")),
            pdf.to_vec(),
        )],
    }
}

/// Formats minor units as `USD 12.34`.
fn format_amount(minor_units: i64, currency: Option<&str>) -> String {
    let currency = currency.unwrap_or("usd").to_uppercase();
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    format!("{} {}{}.{:02}", currency, sign, abs / 100, abs % 100)
}
