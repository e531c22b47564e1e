//! PostgreSQL implementation of DeadLetterRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{FailedStep, FailedStepStatus, PipelineStep};
use crate::domain::foundation::{DomainError, ErrorCode, FailedStepId, Timestamp};
use crate::ports::DeadLetterRepository;

/// Durable log of failed downstream steps.
pub struct PostgresDeadLetterRepository {
    pool: PgPool,
}

impl PostgresDeadLetterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn not_found(id: &FailedStepId) -> DomainError {
        DomainError::new(
            ErrorCode::FailedStepNotFound,
            format!("Failed step {} not found", id),
        )
    }
}

/// Database row representation of a dead letter.
#[derive(Debug, sqlx::FromRow)]
struct FailedStepRow {
    id: Uuid,
    event_id: String,
    event_type: String,
    step: String,
    error: String,
    payload: serde_json::Value,
    attempts: i32,
    status: String,
    created_at: DateTime<Utc>,
    last_attempt_at: DateTime<Utc>,
}

impl TryFrom<FailedStepRow> for FailedStep {
    type Error = DomainError;

    fn try_from(row: FailedStepRow) -> Result<Self, Self::Error> {
        let step: PipelineStep = row.step.parse().map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid step value: {}", row.step),
            )
        })?;
        let status: FailedStepStatus = row.status.parse().map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid status value: {}", row.status),
            )
        })?;

        Ok(FailedStep {
            id: FailedStepId::from_uuid(row.id),
            event_id: row.event_id,
            event_type: row.event_type,
            step,
            error: row.error,
            payload: row.payload,
            attempts: row.attempts,
            status,
            created_at: Timestamp::from_datetime(row.created_at),
            last_attempt_at: Timestamp::from_datetime(row.last_attempt_at),
        })
    }
}

#[async_trait]
impl DeadLetterRepository for PostgresDeadLetterRepository {
    async fn record(&self, step: &FailedStep) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO failed_steps (
                id, event_id, event_type, step, error, payload,
                attempts, status, created_at, last_attempt_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(step.id.as_uuid())
        .bind(&step.event_id)
        .bind(&step.event_type)
        .bind(step.step.as_str())
        .bind(&step.error)
        .bind(&step.payload)
        .bind(step.attempts)
        .bind(step.status.as_str())
        .bind(step.created_at.as_datetime())
        .bind(step.last_attempt_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to record dead letter: {}", e)))?;
        Ok(())
    }

    async fn list_pending(&self, limit: u32) -> Result<Vec<FailedStep>, DomainError> {
        let rows: Vec<FailedStepRow> = sqlx::query_as(
            r#"
            SELECT id, event_id, event_type, step, error, payload,
                   attempts, status, created_at, last_attempt_at
            FROM failed_steps
            WHERE status = $1
            ORDER BY created_at
            LIMIT $2
            "#,
        )
        .bind(FailedStepStatus::Pending.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list dead letters: {}", e)))?;

        rows.into_iter().map(FailedStep::try_from).collect()
    }

    async fn mark_resolved(&self, id: &FailedStepId) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE failed_steps SET status = $2, last_attempt_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(FailedStepStatus::Resolved.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to resolve dead letter: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn record_attempt(&self, id: &FailedStepId, error: &str) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE failed_steps SET
                attempts = attempts + 1,
                error = $2,
                last_attempt_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to record replay attempt: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }
}
