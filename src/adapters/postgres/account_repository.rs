//! PostgreSQL implementation of AccountRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{Account, PlanTier};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Timestamp};
use crate::ports::AccountRepository;

const SELECT_ACCOUNT: &str = r#"
    SELECT id, plan, seats, stripe_subscription_id, stripe_customer_id, updated_at
    FROM accounts
"#;

/// PostgreSQL implementation of the AccountRepository port.
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, filter: &str, value: &str) -> Result<Option<Account>, DomainError> {
        let sql = format!("{} WHERE {} = $1 LIMIT 1", SELECT_ACCOUNT, filter);
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to load account: {}", e)))?;
        row.map(Account::try_from).transpose()
    }
}

/// Database row representation of an account.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: String,
    plan: String,
    seats: i32,
    stripe_subscription_id: Option<String>,
    stripe_customer_id: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = DomainError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let plan: PlanTier = row.plan.parse().map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid plan value: {}", row.plan),
            )
        })?;

        Ok(Account {
            id: AccountId::new(row.id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid account id: {}", e))
            })?,
            plan,
            seats: row.seats,
            stripe_subscription_id: row.stripe_subscription_id,
            stripe_customer_id: row.stripe_customer_id,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        self.find_one("id", id.as_str()).await
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Account>, DomainError> {
        self.find_one("stripe_subscription_id", subscription_id).await
    }

    async fn find_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Account>, DomainError> {
        self.find_one("stripe_customer_id", customer_id).await
    }

    async fn update(&self, account: &Account) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                plan = $2,
                seats = $3,
                stripe_subscription_id = $4,
                stripe_customer_id = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(account.id.as_str())
        .bind(account.plan.as_str())
        .bind(account.seats)
        .bind(&account.stripe_subscription_id)
        .bind(&account.stripe_customer_id)
        .bind(account.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update account: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::AccountNotFound,
                format!("Account {} not found", account.id),
            ));
        }
        Ok(())
    }
}
