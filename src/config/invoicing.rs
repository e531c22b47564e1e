//! Invoice pipeline configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct InvoicingConfig {
    /// PDF rendering service endpoint. Unset uses the built-in placeholder renderer.
    pub renderer_url: Option<String>,

    /// Upper bound for each downstream call
    #[serde(default = "default_step_timeout")]
    pub step_timeout_secs: u64,
}

impl InvoicingConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.step_timeout_secs == 0 || self.step_timeout_secs > 120 {
            return Err(ValidationError::InvalidStepTimeout);
        }
        match &self.renderer_url {
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                Err(ValidationError::InvalidUrl("invoicing.renderer_url"))
            }
            _ => Ok(()),
        }
    }
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        Self {
            renderer_url: None,
            step_timeout_secs: default_step_timeout(),
        }
    }
}

fn default_step_timeout() -> u64 {
    20
}
