//! In-memory event audit log.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::EventLogEntry;
use crate::domain::foundation::DomainError;
use crate::ports::EventLogRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryEventLogRepository {
    entries: Arc<RwLock<Vec<EventLogEntry>>>,
    fail_appends: Arc<RwLock<bool>>,
}

impl InMemoryEventLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<EventLogEntry> {
        self.entries.read().await.clone()
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.fail_appends.write().await = failing;
    }
}

#[async_trait]
impl EventLogRepository for InMemoryEventLogRepository {
    async fn append(&self, entry: &EventLogEntry) -> Result<(), DomainError> {
        if *self.fail_appends.read().await {
            return Err(DomainError::database("event log unavailable"));
        }
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn contains(&self, event_id: &str) -> Result<bool, DomainError> {
        if *self.fail_appends.read().await {
            return Err(DomainError::database("event log unavailable"));
        }
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .any(|e| e.event_id == event_id))
    }
}
