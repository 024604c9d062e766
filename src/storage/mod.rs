//! External object storage for uploaded file bytes.
//!
//! The database only carries file metadata; the bytes live behind this
//! trait. Deleting a file row must also release the stored object, keyed
//! by the row's `url`.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage operation failed: {0}")]
    Backend(String),
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Remove the stored object for the given key. Missing objects are not
    /// an error; the row is already gone by the time this runs.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// No-op backend for deployments without object storage configured (and
/// for tests).
pub struct NullStorage;

#[async_trait]
impl FileStorage for NullStorage {
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        tracing::debug!("null storage: skipping delete of {}", key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_storage_always_succeeds() {
        assert!(NullStorage.delete("uploads/abc").await.is_ok());
    }
}
