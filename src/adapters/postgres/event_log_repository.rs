//! PostgreSQL implementation of EventLogRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::EventLogEntry;
use crate::domain::foundation::DomainError;
use crate::ports::EventLogRepository;

/// Append-only audit log table.
pub struct PostgresEventLogRepository {
    pool: PgPool,
}

impl PostgresEventLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLogRepository for PostgresEventLogRepository {
    async fn append(&self, entry: &EventLogEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO event_logs (event_id, event_type, payload, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&entry.event_id)
        .bind(&entry.event_type)
        .bind(&entry.payload)
        .bind(entry.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to append event log: {}", e)))?;
        Ok(())
    }

    async fn contains(&self, event_id: &str) -> Result<bool, DomainError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM event_logs WHERE event_id = $1)")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to query event log: {}", e)))?;
        Ok(exists)
    }
}
