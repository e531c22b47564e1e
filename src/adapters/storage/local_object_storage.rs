//! Local filesystem object storage.
//!
//! Objects live under a base directory at their key path:
//!
//! ```text
//! {base_path}/invoices/{account_id}/{invoice}.pdf
//! ```
//!
//! Writes go to a temp file first and are renamed into place, so a reader
//! never sees a partial document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::ports::{validate_key, ObjectStorage, StorageError};

/// Maximum object size (25 MB).
const MAX_OBJECT_SIZE_BYTES: usize = 25 * 1024 * 1024;

pub struct LocalObjectStorage {
    base_path: PathBuf,
    /// Prefix for returned URLs. Falls back to `file://` paths when unset.
    public_base_url: Option<String>,
}

impl LocalObjectStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: None,
        }
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        let trimmed = url.trim().trim_end_matches('/');
        self.public_base_url = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn object_path(&self, key: &str) -> PathBuf {
        key.split('/')
            .fold(self.base_path.clone(), |path, segment| path.join(segment))
    }

    fn url_for(&self, key: &str, path: &Path) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base, key),
            None => format!("file://{}", path.display()),
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        if bytes.len() > MAX_OBJECT_SIZE_BYTES {
            return Err(StorageError::io(format!(
                "Object too large: {} bytes (max: {})",
                bytes.len(),
                MAX_OBJECT_SIZE_BYTES
            )));
        }

        let final_path = self.object_path(key);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::io(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let temp_path = final_path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            StorageError::io(format!(
                "Failed to create temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.write_all(bytes).await.map_err(|e| {
            StorageError::io(format!(
                "Failed to write to temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::io(format!(
                "Failed to sync temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::io(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                final_path.display(),
                e
            )));
        }

        tracing::debug!(
            key = %key,
            size_bytes = bytes.len(),
            sha256 = %hex::encode(Sha256::digest(bytes)),
            "Stored object"
        );

        Ok(self.url_for(key, &final_path))
    }
}
