//! In-memory object storage.
//!
//! Keeps objects in a map. Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ports::{validate_key, ObjectStorage, StorageError};

#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStorage {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    fail_puts: Arc<RwLock<bool>>,
}

impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Makes subsequent puts fail, simulating a storage outage.
    pub async fn set_failing(&self, failing: bool) {
        *self.fail_puts.write().await = failing;
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        if *self.fail_puts.read().await {
            return Err(StorageError::io("storage unavailable"));
        }
        self.objects
            .write()
            .await
            .insert(key.to_string(), bytes.to_vec());
        Ok(format!("memory://{}", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get() {
        let storage = InMemoryObjectStorage::new();
        let url = storage.put("a/b.pdf", b"pdf", "application/pdf").await.unwrap();
        assert_eq!(url, "memory://a/b.pdf");
        assert_eq!(storage.get("a/b.pdf").await.unwrap(), b"pdf");
    }

    #[tokio::test]
    async fn failing_storage_stores_nothing() {
        let storage = InMemoryObjectStorage::new();
        storage.set_failing(true).await;
        assert!(storage.put("a/b.pdf", b"pdf", "application/pdf").await.is_err());
        assert!(storage.keys().await.is_empty());
    }
}
