//! Recording mailer for tests and local development.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ports::{EmailMessage, MailError, Mailer};

/// Keeps every sent message in memory instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct MockMailer {
    sent: Arc<RwLock<Vec<EmailMessage>>>,
    fail_sends: Arc<RwLock<bool>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.read().await.clone()
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.fail_sends.write().await = failing;
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if *self.fail_sends.read().await {
            return Err(MailError::Delivery("mailer unavailable".to_string()));
        }
        tracing::debug!(to = %message.to, subject = %message.subject, "Recorded outbound email");
        self.sent.write().await.push(message.clone());
        Ok(())
    }
}
