//! Outbound email port.

use async_trait::async_trait;
use thiserror::Error;

/// Sends transactional email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// A single outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    /// HTML body.
    pub body: String,
    pub attachments: Vec<EmailAttachment>,
}

/// A binary attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl EmailAttachment {
    pub fn pdf(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "application/pdf".to_string(),
            content,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("Mailer is not configured")]
    NotConfigured,

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mailer_is_object_safe() {
        fn _accepts_dyn(_mailer: &dyn Mailer) {}
    }

    #[test]
    fn pdf_attachment_sets_content_type() {
        let att = EmailAttachment::pdf("INV-1.pdf", vec![1, 2, 3]);
        assert_eq!(att.content_type, "application/pdf");
        assert_eq!(att.content.len(), 3);
    }
}
