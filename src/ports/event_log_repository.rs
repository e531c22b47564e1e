//! Append-only event audit log port.

use async_trait::async_trait;

use crate::domain::billing::EventLogEntry;
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait EventLogRepository: Send + Sync {
    async fn append(&self, entry: &EventLogEntry) -> Result<(), DomainError>;

    /// Whether any entry exists for the provider event id.
    async fn contains(&self, event_id: &str) -> Result<bool, DomainError>;
}
