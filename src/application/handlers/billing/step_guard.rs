//! Timeout and error mapping shared by every downstream call.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::domain::billing::{PipelineStep, StepFailure, WebhookError};

/// Default bound on a single downstream call.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(20);

/// Runs one downstream call under `limit`, tagging any failure with `step`.
pub(crate) async fn bounded<T, E, F>(
    step: PipelineStep,
    limit: Duration,
    operation: F,
) -> Result<T, WebhookError>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(WebhookError::downstream(step, e)),
        Err(_) => Err(WebhookError::Timeout {
            step,
            secs: limit.as_secs(),
        }),
    }
}

/// Converts a branch error into a dead-letter candidate.
pub(crate) fn step_failure(err: &WebhookError, fallback: PipelineStep) -> StepFailure {
    StepFailure::new(err.step().unwrap_or(fallback), err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bounded_passes_values_through() {
        let result: Result<u8, WebhookError> = bounded(
            PipelineStep::InvoiceUpload,
            Duration::from_secs(1),
            async { Ok::<_, std::io::Error>(7) },
        )
        .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn bounded_tags_errors_with_step() {
        let err = bounded(PipelineStep::InvoiceEmail, Duration::from_secs(1), async {
            Err::<(), _>("smtp down")
        })
        .await
        .unwrap_err();

        assert_eq!(err.step(), Some(PipelineStep::InvoiceEmail));
        assert_eq!(err.to_string(), "invoice_email failed: smtp down");
    }

    #[tokio::test]
    async fn bounded_times_out_hung_calls() {
        let err = bounded(PipelineStep::InvoiceUpload, Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, String>(())
        })
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            WebhookError::Timeout {
                step: PipelineStep::InvoiceUpload,
                ..
            }
        ));
    }

    #[test]
    fn step_failure_prefers_error_step() {
        let err = WebhookError::downstream(PipelineStep::UserSync, "db");
        assert_eq!(
            step_failure(&err, PipelineStep::AccountReconcile).step,
            PipelineStep::UserSync
        );
        let other = WebhookError::InvalidPayload("x".into());
        assert_eq!(
            step_failure(&other, PipelineStep::AccountReconcile).step,
            PipelineStep::AccountReconcile
        );
    }
}
