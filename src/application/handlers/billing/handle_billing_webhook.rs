//! HandleBillingWebhookHandler - verifies a provider delivery, dispatches
//! it to every matching branch and dead-letters whatever failed.
//!
//! Only authentication and configuration failures surface as errors. Any
//! verified event is acknowledged, whatever its branches reported.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::invoice_pipeline::PipelineMode;
use super::process_billing_event::{BillingEventProcessor, BranchReport};
use crate::domain::billing::{FailedStep, StripeEvent, WebhookError};
use crate::ports::DeadLetterRepository;

/// Command to handle a provider webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleBillingWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header value, if present.
    pub signature: Option<String>,
}

/// Acknowledgment returned for every verified event.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub event_id: String,
    pub event_type: String,
    pub branches: Vec<BranchReport>,
}

impl WebhookAck {
    /// Number of failed steps across all branches.
    pub fn failure_count(&self) -> usize {
        self.branches.iter().map(|b| b.failures.len()).sum()
    }
}

/// Event router for billing webhooks.
pub struct HandleBillingWebhookHandler {
    processor: Option<Arc<BillingEventProcessor>>,
    dead_letters: Arc<dyn DeadLetterRepository>,
}

impl HandleBillingWebhookHandler {
    pub fn new(
        processor: Arc<BillingEventProcessor>,
        dead_letters: Arc<dyn DeadLetterRepository>,
    ) -> Self {
        Self {
            processor: Some(processor),
            dead_letters,
        }
    }

    /// A router with no provider credentials. Rejects every delivery.
    pub fn unconfigured(dead_letters: Arc<dyn DeadLetterRepository>) -> Self {
        Self {
            processor: None,
            dead_letters,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.processor.is_some()
    }

    pub async fn handle(&self, cmd: HandleBillingWebhookCommand) -> Result<WebhookAck, WebhookError> {
        debug!(bytes = cmd.payload.len(), "Webhook received");

        let Some(processor) = &self.processor else {
            error!("Webhook rejected: payment provider keys are not configured");
            return Err(WebhookError::ProviderNotConfigured);
        };

        let Some(signature) = cmd.signature.as_deref().filter(|s| !s.trim().is_empty()) else {
            warn!("Webhook rejected: missing signature header");
            return Err(WebhookError::MissingSignature);
        };

        let event = processor
            .payment_provider()
            .verify_webhook(&cmd.payload, signature)
            .await
            .map_err(|e| {
                warn!(error = %e, error_code = e.error_code(), "Webhook rejected");
                e
            })?;
        info!(
            event_id = %event.id,
            event_type = %event.event_type,
            livemode = event.livemode,
            "Webhook verified"
        );

        let branches = processor.process(&event, PipelineMode::Live).await;
        for report in &branches {
            self.dead_letter(&event, report).await;
        }

        let ack = WebhookAck {
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            branches,
        };
        info!(
            event_id = %ack.event_id,
            event_type = %ack.event_type,
            branches = ack.branches.len(),
            failures = ack.failure_count(),
            "Webhook acknowledged"
        );
        Ok(ack)
    }

    /// Best-effort: a dead-letter write failure is logged, never escalated.
    async fn dead_letter(&self, event: &StripeEvent, report: &BranchReport) {
        for failure in &report.failures {
            let step = FailedStep::new(event, failure);
            match self.dead_letters.record(&step).await {
                Ok(()) => info!(
                    event_id = %event.id,
                    step = %failure.step,
                    failed_step_id = %step.id,
                    "Failed step dead-lettered"
                ),
                Err(e) => error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    step = %failure.step,
                    step_error = %failure.error,
                    error = %e,
                    "Dead-letter write failed; step needs manual reconciliation"
                ),
            }
        }
    }
}
