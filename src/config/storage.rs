//! Invoice document storage configuration

use serde::Deserialize;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for stored documents
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Public URL prefix that serves `base_path`
    pub public_base_url: Option<String>,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_path.trim().is_empty() {
            return Err(ValidationError::MissingRequired("STORAGE__BASE_PATH"));
        }
        match &self.public_base_url {
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                Err(ValidationError::InvalidUrl("storage.public_base_url"))
            }
            _ => Ok(()),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            public_base_url: None,
        }
    }
}

fn default_base_path() -> String {
    "./data/invoices".to_string()
}
