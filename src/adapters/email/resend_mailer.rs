//! Resend email adapter.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::ports::{EmailMessage, MailError, Mailer};

const DEFAULT_API_BASE_URL: &str = "https://api.resend.com";

#[derive(Clone)]
pub struct ResendMailer {
    client: Client,
    api_key: SecretString,
    from: String,
    api_base_url: String,
}

impl ResendMailer {
    /// `from` is a full header value, e.g. `Billing <billing@example.com>`.
    pub fn new(api_key: SecretString, from: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            from: from.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct ResendReq<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<ResendAttachment<'a>>,
}

#[derive(Serialize)]
struct ResendAttachment<'a> {
    filename: &'a str,
    /// Base64-encoded file content.
    content: String,
    content_type: &'a str,
}

fn build_request<'a>(from: &'a str, message: &'a EmailMessage) -> ResendReq<'a> {
    ResendReq {
        from,
        to: [message.to.as_str()],
        subject: &message.subject,
        html: &message.body,
        attachments: message
            .attachments
            .iter()
            .map(|a| ResendAttachment {
                filename: &a.filename,
                content: BASE64.encode(&a.content),
                content_type: &a.content_type,
            })
            .collect(),
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if self.api_key.expose_secret().is_empty() {
            return Err(MailError::NotConfigured);
        }
        if !message.to.contains('@') {
            return Err(MailError::InvalidRecipient(message.to.clone()));
        }

        let body = build_request(&self.from, message);
        self.client
            .post(format!("{}/emails", self.api_base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?
            .error_for_status()
            .map_err(|e| MailError::Delivery(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::EmailAttachment;

    fn message() -> EmailMessage {
        EmailMessage {
            to: "a@b.com".into(),
            subject: "Your invoice".into(),
            body: "<p>Hi</p>".into(),
            attachments: vec![EmailAttachment::pdf("INV-1.pdf", b"%PDF".to_vec())],
        }
    }

    #[test]
    fn request_encodes_attachments_as_base64() {
        let msg = message();
        let req = build_request("Billing <b@x.com>", &msg);
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["to"][0], "a@b.com");
        assert_eq!(json["attachments"][0]["filename"], "INV-1.pdf");
        assert_eq!(json["attachments"][0]["content"], "JVBERg==");
        assert_eq!(json["attachments"][0]["content_type"], "application/pdf");
    }

    #[test]
    fn request_omits_empty_attachments() {
        let mut msg = message();
        msg.attachments.clear();
        let json = serde_json::to_value(build_request("b@x.com", &msg)).unwrap();
        assert!(json.get("attachments").is_none());
    }

    #[tokio::test]
    async fn send_without_api_key_is_not_configured() {
        let mailer = ResendMailer::new(SecretString::new(String::new()), "b@x.com");
        assert!(matches!(mailer.send(&message()).await, Err(MailError::NotConfigured)));
    }

    #[tokio::test]
    async fn send_rejects_invalid_recipient() {
        let mailer = ResendMailer::new(SecretString::new("re_test".into()), "b@x.com");
        let mut msg = message();
        msg.to = "not-an-email".into();
        assert!(matches!(mailer.send(&msg).await, Err(MailError::InvalidRecipient(_))));
    }
}
