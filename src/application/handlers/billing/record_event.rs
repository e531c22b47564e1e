//! EventAuditLog - best-effort snapshot of processed provider events.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::step_guard::DEFAULT_STEP_TIMEOUT;
use crate::domain::billing::{EventLogEntry, StripeEvent};
use crate::ports::EventLogRepository;

/// Appends raw event payloads to the audit log.
///
/// Failures are logged and swallowed: the audit log never blocks or fails
/// the processing it records, and is never dead-lettered.
#[derive(Clone)]
pub struct EventAuditLog {
    repository: Arc<dyn EventLogRepository>,
    timeout: Duration,
}

impl EventAuditLog {
    pub fn new(repository: Arc<dyn EventLogRepository>) -> Self {
        Self {
            repository,
            timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Records the event unless an entry for its id already exists.
    ///
    /// A failed lookup falls through to the append.
    pub async fn record_once(&self, event: &StripeEvent) -> bool {
        match tokio::time::timeout(self.timeout, self.repository.contains(&event.id)).await {
            Ok(Ok(true)) => {
                debug!(event_id = %event.id, "Event already in audit log");
                false
            }
            Ok(Ok(false)) => self.record(event).await,
            Ok(Err(e)) => {
                warn!(event_id = %event.id, error = %e, "Audit log lookup failed; appending");
                self.record(event).await
            }
            Err(_) => {
                warn!(event_id = %event.id, "Audit log lookup timed out; appending");
                self.record(event).await
            }
        }
    }

    /// Records the event. Returns whether the entry was stored.
    pub async fn record(&self, event: &StripeEvent) -> bool {
        let entry = EventLogEntry::from_event(event);
        match tokio::time::timeout(self.timeout, self.repository.append(&entry)).await {
            Ok(Ok(())) => {
                debug!(event_id = %event.id, event_type = %event.event_type, "Event recorded in audit log");
                true
            }
            Ok(Err(e)) => {
                warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %e,
                    "Audit log write failed; continuing"
                );
                false
            }
            Err(_) => {
                warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    timeout_secs = self.timeout.as_secs(),
                    "Audit log write timed out; continuing"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryEventLogRepository;
    use crate::domain::billing::StripeEventBuilder;
    use serde_json::json;

    #[tokio::test]
    async fn records_raw_payload_snapshot() {
        let repo = Arc::new(InMemoryEventLogRepository::new());
        let audit = EventAuditLog::new(repo.clone());
        let event = StripeEventBuilder::new()
            .id("evt_audit")
            .event_type("invoice.finalized")
            .object(json!({ "id": "in_1", "amount_due": 900 }))
            .build();

        assert!(audit.record(&event).await);

        let entries = repo.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_id, "evt_audit");
        assert_eq!(entries[0].payload["data"]["object"]["amount_due"], 900);
    }

    #[tokio::test]
    async fn record_once_skips_known_event() {
        let repo = Arc::new(InMemoryEventLogRepository::new());
        let audit = EventAuditLog::new(repo.clone());
        let event = StripeEventBuilder::new().id("evt_once").build();

        assert!(audit.record_once(&event).await);
        assert!(!audit.record_once(&event).await);

        assert_eq!(repo.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        let repo = Arc::new(InMemoryEventLogRepository::new());
        repo.set_failing(true).await;
        let audit = EventAuditLog::new(repo.clone());

        assert!(!audit.record(&StripeEventBuilder::new().build()).await);
        assert!(repo.entries().await.is_empty());
    }
}
