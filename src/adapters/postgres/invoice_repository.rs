//! PostgreSQL implementation of InvoiceRepository.
//!
//! Invoices are unique on `stripe_invoice_id`; writes are upserts so a
//! redelivered finalization event converges on one row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Invoice, UpsertOutcome};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, InvoiceId, Timestamp};
use crate::ports::InvoiceRepository;

/// PostgreSQL implementation of the InvoiceRepository port.
pub struct PostgresInvoiceRepository {
    pool: PgPool,
}

impl PostgresInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an invoice.
#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    account_id: String,
    stripe_invoice_id: String,
    number: Option<String>,
    amount_due: i64,
    currency: Option<String>,
    period_start: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
    pdf_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DomainError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice {
            id: InvoiceId::from_uuid(row.id),
            account_id: AccountId::new(row.account_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid account id: {}", e))
            })?,
            stripe_invoice_id: row.stripe_invoice_id,
            number: row.number,
            amount_due: row.amount_due,
            currency: row.currency,
            period_start: row.period_start.map(Timestamp::from_datetime),
            period_end: row.period_end.map(Timestamp::from_datetime),
            pdf_url: row.pdf_url,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
    async fn upsert(&self, invoice: &Invoice) -> Result<UpsertOutcome, DomainError> {
        // xmax is zero only for a freshly inserted tuple.
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO invoices (
                id, account_id, stripe_invoice_id, number, amount_due, currency,
                period_start, period_end, pdf_url, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            ON CONFLICT (stripe_invoice_id) DO UPDATE SET
                account_id = EXCLUDED.account_id,
                number = EXCLUDED.number,
                amount_due = EXCLUDED.amount_due,
                currency = EXCLUDED.currency,
                period_start = EXCLUDED.period_start,
                period_end = EXCLUDED.period_end,
                pdf_url = COALESCE(EXCLUDED.pdf_url, invoices.pdf_url),
                updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.account_id.as_str())
        .bind(&invoice.stripe_invoice_id)
        .bind(&invoice.number)
        .bind(invoice.amount_due)
        .bind(&invoice.currency)
        .bind(invoice.period_start.map(|t| *t.as_datetime()))
        .bind(invoice.period_end.map(|t| *t.as_datetime()))
        .bind(&invoice.pdf_url)
        .bind(invoice.created_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to upsert invoice: {}", e)))?;

        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn find_by_stripe_invoice_id(
        &self,
        stripe_invoice_id: &str,
    ) -> Result<Option<Invoice>, DomainError> {
        let row: Option<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT id, account_id, stripe_invoice_id, number, amount_due, currency,
                   period_start, period_end, pdf_url, created_at
            FROM invoices
            WHERE stripe_invoice_id = $1
            "#,
        )
        .bind(stripe_invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load invoice: {}", e)))?;

        row.map(Invoice::try_from).transpose()
    }
}
