//! In-memory dead-letter log.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{FailedStep, FailedStepStatus};
use crate::domain::foundation::{DomainError, ErrorCode, FailedStepId, Timestamp};
use crate::ports::DeadLetterRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryDeadLetterRepository {
    steps: Arc<RwLock<Vec<FailedStep>>>,
    failing: Arc<RwLock<bool>>,
}

impl InMemoryDeadLetterRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<FailedStep> {
        self.steps.read().await.clone()
    }

    pub async fn pending_count(&self) -> usize {
        self.steps.read().await.iter().filter(|s| s.is_pending()).count()
    }

    /// Make `record` fail until reset.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    async fn modify<F>(&self, id: &FailedStepId, f: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut FailedStep) + Send,
    {
        let mut steps = self.steps.write().await;
        let step = steps.iter_mut().find(|s| &s.id == id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::FailedStepNotFound,
                format!("Failed step {} not found", id),
            )
        })?;
        f(step);
        Ok(())
    }
}

#[async_trait]
impl DeadLetterRepository for InMemoryDeadLetterRepository {
    async fn record(&self, step: &FailedStep) -> Result<(), DomainError> {
        if *self.failing.read().await {
            return Err(DomainError::database("dead-letter store unavailable"));
        }
        self.steps.write().await.push(step.clone());
        Ok(())
    }

    async fn list_pending(&self, limit: u32) -> Result<Vec<FailedStep>, DomainError> {
        let steps = self.steps.read().await;
        let mut pending: Vec<FailedStep> =
            steps.iter().filter(|s| s.is_pending()).cloned().collect();
        pending.sort_by_key(|s| s.created_at);
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn mark_resolved(&self, id: &FailedStepId) -> Result<(), DomainError> {
        self.modify(id, |step| {
            step.status = FailedStepStatus::Resolved;
            step.last_attempt_at = Timestamp::now();
        })
        .await
    }

    async fn record_attempt(&self, id: &FailedStepId, error: &str) -> Result<(), DomainError> {
        let error = error.to_string();
        self.modify(id, move |step| {
            step.attempts += 1;
            step.error = error;
            step.last_attempt_at = Timestamp::now();
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{PipelineStep, StepFailure, StripeEventBuilder};

    fn failed(step: PipelineStep) -> FailedStep {
        let event = StripeEventBuilder::new().build();
        FailedStep::new(&event, &StepFailure::new(step, "boom"))
    }

    #[tokio::test]
    async fn list_pending_respects_limit_and_status() {
        let repo = InMemoryDeadLetterRepository::new();
        let a = failed(PipelineStep::InvoiceUpload);
        let b = failed(PipelineStep::InvoiceEmail);
        repo.record(&a).await.unwrap();
        repo.record(&b).await.unwrap();
        repo.record(&failed(PipelineStep::UserSync)).await.unwrap();

        repo.mark_resolved(&a.id).await.unwrap();

        let pending = repo.list_pending(1).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_ne!(pending[0].id, a.id);
        assert_eq!(repo.pending_count().await, 2);
    }

    #[tokio::test]
    async fn record_attempt_increments_and_keeps_latest_error() {
        let repo = InMemoryDeadLetterRepository::new();
        let step = failed(PipelineStep::InvoiceEmail);
        repo.record(&step).await.unwrap();

        repo.record_attempt(&step.id, "still down").await.unwrap();

        let stored = &repo.all().await[0];
        assert_eq!(stored.attempts, 2);
        assert_eq!(stored.error, "still down");
        assert!(stored.is_pending());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let repo = InMemoryDeadLetterRepository::new();
        let err = repo.mark_resolved(&FailedStepId::new()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::FailedStepNotFound);
    }
}
