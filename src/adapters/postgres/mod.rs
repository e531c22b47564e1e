//! PostgreSQL adapters - Database implementations for the store ports.
//!
//! - `PostgresAccountRepository` - account plan, seats and provider ids
//! - `PostgresUserRepository` - per-user subscription attributes, matched by email
//! - `PostgresInvoiceRepository` - invoice upsert keyed by the provider invoice id
//! - `PostgresEventLogRepository` - append-only audit log
//! - `PostgresDeadLetterRepository` - failed steps awaiting replay

mod account_repository;
mod dead_letter_repository;
mod event_log_repository;
mod invoice_repository;
mod user_repository;

pub use account_repository::PostgresAccountRepository;
pub use dead_letter_repository::PostgresDeadLetterRepository;
pub use event_log_repository::PostgresEventLogRepository;
pub use invoice_repository::PostgresInvoiceRepository;
pub use user_repository::PostgresUserRepository;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::config::DatabaseConfig;

/// Opens the connection pool described by `config`.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout())
        .connect(&config.url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Applies the embedded migrations under `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations complete");
    Ok(())
}
