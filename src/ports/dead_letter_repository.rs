//! Dead-letter log port for failed downstream steps.
//!
//! Distinct from the event audit log: entries here are durable work items
//! that a reconciliation job replays until they succeed.

use async_trait::async_trait;

use crate::domain::billing::FailedStep;
use crate::domain::foundation::{DomainError, FailedStepId};

#[async_trait]
pub trait DeadLetterRepository: Send + Sync {
    /// Stores a new failed step.
    async fn record(&self, step: &FailedStep) -> Result<(), DomainError>;

    /// Oldest pending entries first, at most `limit`.
    async fn list_pending(&self, limit: u32) -> Result<Vec<FailedStep>, DomainError>;

    /// Marks an entry resolved after a clean replay.
    ///
    /// # Errors
    ///
    /// - `FailedStepNotFound` if the entry doesn't exist
    async fn mark_resolved(&self, id: &FailedStepId) -> Result<(), DomainError>;

    /// Bumps the attempt counter and stores the latest error.
    async fn record_attempt(&self, id: &FailedStepId, error: &str) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_letter_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn DeadLetterRepository) {}
    }
}
