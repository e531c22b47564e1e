//! Webhook error types and their classification.
//!
//! Only authentication and configuration failures change the HTTP
//! response. Everything else is acknowledged with 200 and handled inside
//! the branch that raised it.

use axum::http::StatusCode;
use thiserror::Error;

use super::failed_step::PipelineStep;

/// Coarse class of a webhook failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad or missing signature. Request rejected, nothing dispatched.
    Authentication,
    /// Provider credentials missing. Request rejected.
    Configuration,
    /// No matching account or user. Logged no-op.
    Resolution,
    /// Render, storage, store, email or provider failure. Logged, isolated per step.
    Downstream,
}

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Request carried no signature header.
    #[error("Missing signature header")]
    MissingSignature,

    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is older than the configured tolerance.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Signature verified but the body is not a provider event.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Provider secret key or signing secret is not configured.
    #[error("Payment provider is not configured")]
    ProviderNotConfigured,

    /// No internal account matches the event.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// No user record matches the billing email.
    #[error("No user matches email {0}")]
    UserNotFound(String),

    /// A downstream collaborator failed.
    #[error("{step} failed: {message}")]
    Downstream { step: PipelineStep, message: String },

    /// A downstream collaborator did not answer in time.
    #[error("{step} timed out after {secs}s")]
    Timeout { step: PipelineStep, secs: u64 },
}

impl WebhookError {
    pub fn downstream(step: PipelineStep, message: impl std::fmt::Display) -> Self {
        WebhookError::Downstream {
            step,
            message: message.to_string(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_)
            | WebhookError::InvalidPayload(_) => ErrorClass::Authentication,
            WebhookError::ProviderNotConfigured => ErrorClass::Configuration,
            WebhookError::AccountNotFound(_) | WebhookError::UserNotFound(_) => {
                ErrorClass::Resolution
            }
            WebhookError::Downstream { .. } | WebhookError::Timeout { .. } => {
                ErrorClass::Downstream
            }
        }
    }

    /// The pipeline step a downstream failure belongs to.
    pub fn step(&self) -> Option<PipelineStep> {
        match self {
            WebhookError::Downstream { step, .. } | WebhookError::Timeout { step, .. } => {
                Some(*step)
            }
            _ => None,
        }
    }

    /// Maps the error to the HTTP status returned to the provider.
    ///
    /// A non-2xx makes the provider redeliver, so only requests that were
    /// never dispatched get one.
    pub fn status_code(&self) -> StatusCode {
        match self.class() {
            ErrorClass::Authentication | ErrorClass::Configuration => StatusCode::BAD_REQUEST,
            ErrorClass::Resolution | ErrorClass::Downstream => StatusCode::OK,
        }
    }

    /// Stable machine-readable code for rejection bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_) => "INVALID_SIGNATURE",
            WebhookError::InvalidPayload(_) => "INVALID_PAYLOAD",
            WebhookError::ProviderNotConfigured => "PROVIDER_NOT_CONFIGURED",
            WebhookError::AccountNotFound(_) | WebhookError::UserNotFound(_) => "NOT_FOUND",
            WebhookError::Downstream { .. } | WebhookError::Timeout { .. } => "DOWNSTREAM_ERROR",
        }
    }
}
