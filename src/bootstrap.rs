//! Wiring: turns an `AppConfig` into a ready router and replay handler.
//!
//! Stores are PostgreSQL when a database URL is configured and in-memory
//! otherwise. Without Stripe keys the webhook endpoint answers every delivery
//! with `PROVIDER_NOT_CONFIGURED` and replay is unavailable.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use secrecy::SecretString;
use thiserror::Error;
use tracing::{info, warn};

use crate::adapters::document::{HttpInvoiceRenderer, MockInvoiceRenderer};
use crate::adapters::email::ResendMailer;
use crate::adapters::http::{billing_router, BillingAppState};
use crate::adapters::memory::{
    InMemoryAccountRepository, InMemoryDeadLetterRepository, InMemoryEventLogRepository,
    InMemoryInvoiceRepository, InMemoryUserRepository,
};
use crate::adapters::postgres::{
    self, PostgresAccountRepository, PostgresDeadLetterRepository, PostgresEventLogRepository,
    PostgresInvoiceRepository, PostgresUserRepository,
};
use crate::adapters::storage::LocalObjectStorage;
use crate::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use crate::application::handlers::billing::{
    AccountReconciler, BillingEventProcessor, EventAuditLog, HandleBillingWebhookHandler,
    InvoicePipeline, ReplayFailedStepsHandler, UserSubscriptionSync,
};
use crate::config::{AppConfig, ConfigError};
use crate::domain::billing::{PlanResolver, PriceMappings};
use crate::ports::{
    AccountRepository, DeadLetterRepository, EventLogRepository, InvoiceRenderer,
    InvoiceRepository, Mailer, ObjectStorage, PaymentProvider, UserRepository,
};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// The five stores behind the pipeline.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountRepository>,
    pub users: Arc<dyn UserRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub event_logs: Arc<dyn EventLogRepository>,
    pub dead_letters: Arc<dyn DeadLetterRepository>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            accounts: Arc::new(InMemoryAccountRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
            invoices: Arc::new(InMemoryInvoiceRepository::new()),
            event_logs: Arc::new(InMemoryEventLogRepository::new()),
            dead_letters: Arc::new(InMemoryDeadLetterRepository::new()),
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            accounts: Arc::new(PostgresAccountRepository::new(pool.clone())),
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            invoices: Arc::new(PostgresInvoiceRepository::new(pool.clone())),
            event_logs: Arc::new(PostgresEventLogRepository::new(pool.clone())),
            dead_letters: Arc::new(PostgresDeadLetterRepository::new(pool)),
        }
    }
}

/// Every collaborator the pipeline talks to.
pub struct Collaborators {
    pub stores: Stores,
    /// `None` when provider keys are not configured.
    pub payment_provider: Option<Arc<dyn PaymentProvider>>,
    pub renderer: Arc<dyn InvoiceRenderer>,
    pub storage: Arc<dyn ObjectStorage>,
    pub mailer: Arc<dyn Mailer>,
}

/// Assembled application.
pub struct Application {
    webhook_handler: Arc<HandleBillingWebhookHandler>,
    replay_handler: Option<ReplayFailedStepsHandler>,
}

impl Application {
    /// Builds the components over the given collaborators.
    pub fn assemble(
        collaborators: Collaborators,
        price_mappings: PriceMappings,
        step_timeout: Duration,
    ) -> Self {
        let Collaborators {
            stores,
            payment_provider,
            renderer,
            storage,
            mailer,
        } = collaborators;

        let Some(payment_provider) = payment_provider else {
            return Self {
                webhook_handler: Arc::new(HandleBillingWebhookHandler::unconfigured(
                    stores.dead_letters,
                )),
                replay_handler: None,
            };
        };

        let pipeline = InvoicePipeline::new(
            stores.accounts.clone(),
            stores.invoices,
            renderer,
            storage,
            mailer,
            EventAuditLog::new(stores.event_logs).with_timeout(step_timeout),
        )
        .with_step_timeout(step_timeout);

        let processor = Arc::new(
            BillingEventProcessor::new(
                payment_provider,
                Arc::new(PlanResolver::new(price_mappings)),
                AccountReconciler::new(stores.accounts),
                UserSubscriptionSync::new(stores.users),
                pipeline,
            )
            .with_step_timeout(step_timeout),
        );

        Self {
            webhook_handler: Arc::new(HandleBillingWebhookHandler::new(
                processor.clone(),
                stores.dead_letters.clone(),
            )),
            replay_handler: Some(ReplayFailedStepsHandler::new(processor, stores.dead_letters)),
        }
    }

    /// Router with the webhook and health endpoints. Layers are added by the caller.
    pub fn router(&self) -> Router {
        billing_router(BillingAppState::new(self.webhook_handler.clone()))
    }

    pub fn webhook_handler(&self) -> &Arc<HandleBillingWebhookHandler> {
        &self.webhook_handler
    }

    /// `None` when provider keys are not configured.
    pub fn replay_handler(&self) -> Option<&ReplayFailedStepsHandler> {
        self.replay_handler.as_ref()
    }
}

/// Connects to external systems as configured and assembles the application.
pub async fn build(config: &AppConfig) -> Result<Application, BootstrapError> {
    let stores = if config.database.is_configured() {
        let pool = postgres::connect(&config.database).await?;
        if config.database.run_migrations {
            postgres::run_migrations(&pool).await?;
        }
        Stores::postgres(pool)
    } else {
        warn!("No database URL configured; using in-memory stores");
        Stores::in_memory()
    };

    let payment_provider: Option<Arc<dyn PaymentProvider>> = if config.payment.is_configured() {
        let stripe = StripeConfig::new(
            SecretString::new(config.payment.stripe_api_key.clone()),
            SecretString::new(config.payment.stripe_webhook_secret.clone()),
        )
        .with_base_url(config.payment.api_base_url.clone())
        .with_tolerance(config.payment.webhook_tolerance_secs)
        .with_require_livemode(config.payment.require_livemode);
        Some(Arc::new(StripePaymentAdapter::new(stripe)))
    } else {
        warn!("Stripe keys not configured; webhook deliveries will be rejected");
        None
    };

    let renderer: Arc<dyn InvoiceRenderer> = match &config.invoicing.renderer_url {
        Some(url) => Arc::new(HttpInvoiceRenderer::new(url.clone())),
        None => {
            warn!("No renderer URL configured; invoices get placeholder documents");
            Arc::new(MockInvoiceRenderer::new())
        }
    };

    let mut storage = LocalObjectStorage::new(&config.storage.base_path);
    if let Some(url) = &config.storage.public_base_url {
        storage = storage.with_public_base_url(url.clone());
    }

    if !config.email.is_configured() {
        warn!("Resend key not configured; invoice emails will be dead-lettered");
    }
    let mailer = ResendMailer::new(
        SecretString::new(config.email.resend_api_key.clone()),
        config.email.from_header(),
    )
    .with_base_url(config.email.api_base_url.clone());

    let mappings = config.payment.price_mappings();
    info!(
        seat_price_configured = mappings.seat_price_id().is_some(),
        step_timeout_secs = config.invoicing.step_timeout_secs,
        "Billing pipeline configured"
    );

    Ok(Application::assemble(
        Collaborators {
            stores,
            payment_provider,
            renderer,
            storage: Arc::new(storage),
            mailer: Arc::new(mailer),
        },
        mappings,
        config.invoicing.step_timeout(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::email::MockMailer;
    use crate::adapters::storage::InMemoryObjectStorage;

    fn collaborators(payment_provider: Option<Arc<dyn PaymentProvider>>) -> Collaborators {
        Collaborators {
            stores: Stores::in_memory(),
            payment_provider,
            renderer: Arc::new(MockInvoiceRenderer::new()),
            storage: Arc::new(InMemoryObjectStorage::new()),
            mailer: Arc::new(MockMailer::new()),
        }
    }

    #[test]
    fn missing_provider_yields_unconfigured_router() {
        let app = Application::assemble(
            collaborators(None),
            PriceMappings::new(),
            Duration::from_secs(1),
        );

        assert!(!app.webhook_handler().is_configured());
        assert!(app.replay_handler().is_none());
    }

    #[test]
    fn provider_enables_router_and_replay() {
        let provider = Arc::new(crate::adapters::stripe::MockPaymentProvider::new("whsec_x"));
        let app = Application::assemble(
            collaborators(Some(provider)),
            PriceMappings::new(),
            Duration::from_secs(1),
        );

        assert!(app.webhook_handler().is_configured());
        assert!(app.replay_handler().is_some());
    }

    #[tokio::test]
    async fn default_config_builds_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.base_path = dir.path().to_string_lossy().into_owned();

        let app = build(&config).await.unwrap();

        assert!(!app.webhook_handler().is_configured());
    }
}
