//! PostgreSQL implementation of UserRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::SubscriptionAttributes;
use crate::domain::foundation::DomainError;
use crate::ports::UserRepository;

/// PostgreSQL implementation of the UserRepository port.
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn update_subscription_by_email(
        &self,
        email: &str,
        attrs: &SubscriptionAttributes,
    ) -> Result<u64, DomainError> {
        // Absent optional values keep what is stored.
        let result = sqlx::query(
            r#"
            UPDATE users SET
                subscription_plan = $2,
                subscription_status = $3,
                subscription_id = COALESCE($4, subscription_id),
                current_period_end = COALESCE($5, current_period_end),
                updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(&attrs.plan)
        .bind(&attrs.status)
        .bind(&attrs.subscription_id)
        .bind(attrs.current_period_end.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update users: {}", e)))?;

        Ok(result.rows_affected())
    }
}
