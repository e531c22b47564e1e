//! ReplayFailedStepsHandler - re-runs dead-lettered steps from their stored
//! event snapshots.
//!
//! Account, user and subscription steps re-run their whole branch. Invoice
//! steps re-run the invoice pipeline in replay mode, which bypasses the
//! already-recorded check and sends the email only when the original
//! failure means the customer never got one.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::invoice_pipeline::PipelineMode;
use super::process_billing_event::{BillingEventProcessor, Branch};
use crate::domain::billing::{FailedStep, StripeEvent};
use crate::domain::foundation::DomainError;
use crate::ports::DeadLetterRepository;

/// Default number of dead letters processed per run.
pub const DEFAULT_REPLAY_LIMIT: u32 = 100;

/// Command to replay pending dead letters.
#[derive(Debug, Clone, Copy)]
pub struct ReplayFailedStepsCommand {
    pub limit: u32,
}

impl Default for ReplayFailedStepsCommand {
    fn default() -> Self {
        Self {
            limit: DEFAULT_REPLAY_LIMIT,
        }
    }
}

/// Counts from one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub attempted: usize,
    pub resolved: usize,
    pub still_failing: usize,
}

pub struct ReplayFailedStepsHandler {
    processor: Arc<BillingEventProcessor>,
    dead_letters: Arc<dyn DeadLetterRepository>,
}

impl ReplayFailedStepsHandler {
    pub fn new(
        processor: Arc<BillingEventProcessor>,
        dead_letters: Arc<dyn DeadLetterRepository>,
    ) -> Self {
        Self {
            processor,
            dead_letters,
        }
    }

    pub async fn handle(&self, cmd: ReplayFailedStepsCommand) -> Result<ReplaySummary, DomainError> {
        let pending = self.dead_letters.list_pending(cmd.limit).await?;
        let mut summary = ReplaySummary::default();

        for step in pending {
            summary.attempted += 1;
            match self.replay(&step).await {
                Ok(()) => {
                    summary.resolved += 1;
                    info!(failed_step_id = %step.id, event_id = %step.event_id, step = %step.step, "Dead letter resolved");
                    if let Err(e) = self.dead_letters.mark_resolved(&step.id).await {
                        warn!(failed_step_id = %step.id, error = %e, "Could not mark dead letter resolved; it will be replayed again");
                    }
                }
                Err(reason) => {
                    summary.still_failing += 1;
                    warn!(
                        failed_step_id = %step.id,
                        event_id = %step.event_id,
                        step = %step.step,
                        attempts = step.attempts + 1,
                        error = %reason,
                        "Dead letter still failing"
                    );
                    if let Err(e) = self.dead_letters.record_attempt(&step.id, &reason).await {
                        warn!(failed_step_id = %step.id, error = %e, "Could not record replay attempt");
                    }
                }
            }
        }

        info!(
            attempted = summary.attempted,
            resolved = summary.resolved,
            still_failing = summary.still_failing,
            "Replay finished"
        );
        Ok(summary)
    }

    /// Re-runs the unit that produced `step`. `Err` carries the latest error.
    async fn replay(&self, step: &FailedStep) -> Result<(), String> {
        let event = StripeEvent::from_value(step.payload.clone())
            .map_err(|e| format!("stored payload unreadable: {}", e))?;

        let branches: Vec<Branch> = Branch::matching(event.parsed_type())
            .into_iter()
            .filter(|b| (*b == Branch::InvoiceFinalized) == step.step.is_invoice_step())
            .collect();
        if branches.is_empty() {
            return Err(format!("no branch handles {} for step {}", event.event_type, step.step));
        }

        let mode = PipelineMode::Replay {
            send_email: step.step.replay_sends_email(),
        };

        let mut errors = Vec::new();
        for branch in branches {
            let report = self.processor.run_branch(branch, &event, mode).await;
            if report.is_clean() {
                continue;
            }
            errors.extend(report.error);
            errors.extend(report.failures.into_iter().map(|f| f.error));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }
}
