//! Dead-letter records for downstream steps that failed after the
//! provider was already acknowledged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::stripe_event::StripeEvent;
use crate::domain::foundation::{FailedStepId, Timestamp, ValidationError};

/// A downstream unit of work that can fail independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    SubscriptionFetch,
    AccountReconcile,
    UserSync,
    InvoiceResolve,
    InvoiceRender,
    InvoiceUpload,
    InvoicePersist,
    InvoiceEmail,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::SubscriptionFetch => "subscription_fetch",
            PipelineStep::AccountReconcile => "account_reconcile",
            PipelineStep::UserSync => "user_sync",
            PipelineStep::InvoiceResolve => "invoice_resolve",
            PipelineStep::InvoiceRender => "invoice_render",
            PipelineStep::InvoiceUpload => "invoice_upload",
            PipelineStep::InvoicePersist => "invoice_persist",
            PipelineStep::InvoiceEmail => "invoice_email",
        }
    }

    /// True for steps owned by the invoice pipeline.
    pub fn is_invoice_step(&self) -> bool {
        matches!(
            self,
            PipelineStep::InvoiceResolve
                | PipelineStep::InvoiceRender
                | PipelineStep::InvoiceUpload
                | PipelineStep::InvoicePersist
                | PipelineStep::InvoiceEmail
        )
    }

    /// Whether replaying this step must (re)send the customer email.
    ///
    /// A failed lookup or render means no email went out; a failed email
    /// is the email. Upload and persist failures happened alongside a
    /// send that was attempted separately.
    pub fn replay_sends_email(&self) -> bool {
        matches!(
            self,
            PipelineStep::InvoiceResolve | PipelineStep::InvoiceRender | PipelineStep::InvoiceEmail
        )
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PipelineStep {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription_fetch" => Ok(PipelineStep::SubscriptionFetch),
            "account_reconcile" => Ok(PipelineStep::AccountReconcile),
            "user_sync" => Ok(PipelineStep::UserSync),
            "invoice_resolve" => Ok(PipelineStep::InvoiceResolve),
            "invoice_render" => Ok(PipelineStep::InvoiceRender),
            "invoice_upload" => Ok(PipelineStep::InvoiceUpload),
            "invoice_persist" => Ok(PipelineStep::InvoicePersist),
            "invoice_email" => Ok(PipelineStep::InvoiceEmail),
            other => Err(ValidationError::invalid_format(
                "step",
                format!("unknown pipeline step '{}'", other),
            )),
        }
    }
}

/// A failure captured inside a component's isolation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: PipelineStep,
    pub error: String,
}

impl StepFailure {
    pub fn new(step: PipelineStep, error: impl fmt::Display) -> Self {
        Self {
            step,
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStepStatus {
    Pending,
    Resolved,
}

impl FailedStepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailedStepStatus::Pending => "pending",
            FailedStepStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for FailedStepStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FailedStepStatus::Pending),
            "resolved" => Ok(FailedStepStatus::Resolved),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// Durable dead-letter entry, replayable by the reconciliation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedStep {
    pub id: FailedStepId,
    pub event_id: String,
    pub event_type: String,
    pub step: PipelineStep,
    pub error: String,
    /// Raw event snapshot the step can be re-derived from.
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub status: FailedStepStatus,
    pub created_at: Timestamp,
    pub last_attempt_at: Timestamp,
}

impl FailedStep {
    /// Records a first failure of `failure.step` for the event.
    pub fn new(event: &StripeEvent, failure: &StepFailure) -> Self {
        let now = Timestamp::now();
        Self {
            id: FailedStepId::new(),
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            step: failure.step,
            error: failure.error.clone(),
            payload: event.raw().clone(),
            attempts: 1,
            status: FailedStepStatus::Pending,
            created_at: now,
            last_attempt_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == FailedStepStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::StripeEventBuilder;

    #[test]
    fn step_names_roundtrip() {
        for step in [
            PipelineStep::SubscriptionFetch,
            PipelineStep::AccountReconcile,
            PipelineStep::UserSync,
            PipelineStep::InvoiceResolve,
            PipelineStep::InvoiceRender,
            PipelineStep::InvoiceUpload,
            PipelineStep::InvoicePersist,
            PipelineStep::InvoiceEmail,
        ] {
            assert_eq!(step.as_str().parse::<PipelineStep>().unwrap(), step);
        }
        assert!("bogus".parse::<PipelineStep>().is_err());
    }

    #[test]
    fn only_render_and_email_replays_send_email() {
        assert!(PipelineStep::InvoiceResolve.replay_sends_email());
        assert!(PipelineStep::InvoiceRender.replay_sends_email());
        assert!(PipelineStep::InvoiceEmail.replay_sends_email());
        assert!(!PipelineStep::InvoiceUpload.replay_sends_email());
        assert!(!PipelineStep::InvoicePersist.replay_sends_email());
    }

    #[test]
    fn new_failed_step_is_pending_with_snapshot() {
        let event = StripeEventBuilder::new()
            .id("evt_9")
            .event_type("invoice.finalized")
            .build();
        let failure = StepFailure::new(PipelineStep::InvoiceUpload, "bucket unavailable");

        let step = FailedStep::new(&event, &failure);

        assert!(step.is_pending());
        assert_eq!(step.attempts, 1);
        assert_eq!(step.event_id, "evt_9");
        assert_eq!(step.payload["id"], "evt_9");
        assert_eq!(step.error, "bucket unavailable");
    }

    #[test]
    fn status_parses() {
        assert_eq!("pending".parse::<FailedStepStatus>().unwrap(), FailedStepStatus::Pending);
        assert_eq!(FailedStepStatus::Resolved.as_str(), "resolved");
    }
}
