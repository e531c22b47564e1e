//! Object storage port for generated documents.

use async_trait::async_trait;
use thiserror::Error;

/// Stores blobs under caller-chosen keys and returns a retrievable URL.
///
/// # Contract
///
/// - `put` overwrites an existing object with the same key
/// - Writes are all-or-nothing (no partial objects on failure)
/// - Keys are `/`-separated relative paths; `..` segments are rejected
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str)
        -> Result<String, StorageError>;
}

/// Errors from object storage operations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Key is empty or escapes the storage root.
    #[error("Invalid key: {key}")]
    InvalidKey { key: String },

    /// Permission denied writing the object.
    #[error("Permission denied: {key}")]
    PermissionDenied { key: String },

    /// IO or transport error during the operation.
    #[error("IO error: {message}")]
    Io { message: String },
}

impl StorageError {
    /// Creates an invalid key error.
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    /// Creates a permission denied error.
    pub fn permission_denied(key: impl Into<String>) -> Self {
        Self::PermissionDenied { key: key.into() }
    }

    /// Creates an IO error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                key: err.to_string(),
            },
            _ => Self::io(err.to_string()),
        }
    }
}

/// Validates a storage key: non-empty, relative, no parent traversal.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let trimmed = key.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('/')
        || trimmed.split('/').any(|seg| seg.is_empty() || seg == "..")
    {
        return Err(StorageError::invalid_key(key));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_storage_is_object_safe() {
        fn _accepts_dyn(_storage: &dyn ObjectStorage) {}
    }

    #[test]
    fn validate_key_accepts_nested_relative_keys() {
        assert!(validate_key("invoices/acc_1/INV-1.pdf").is_ok());
    }

    #[test]
    fn validate_key_rejects_traversal_and_absolute() {
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("invoices/../secrets").is_err());
        assert!(validate_key("invoices//x.pdf").is_err());
    }

    #[test]
    fn io_error_conversion() {
        let err: StorageError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(err, StorageError::PermissionDenied { .. }));

        let err: StorageError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}
