//! Blob store abstraction trait
//!
//! This module defines the `BlobStore` trait that all storage backends must
//! implement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use atelier_core::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Put failed: {0}")]
    PutFailed(String),

    #[error("Get failed: {0}")]
    GetFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Presign failed: {0}")]
    PresignFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for atelier_core::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => {
                atelier_core::AppError::NotFound(format!("storage object {}", key))
            }
            other => atelier_core::AppError::Storage(other.to_string()),
        }
    }
}

/// One listed object: key plus last-modified time when the backend reports it.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectInfo>,
    pub next_token: Option<String>,
}

/// Blob store abstraction trait
///
/// All backends (S3, local filesystem, in-memory) must implement this trait
/// so the lifecycle services can work with any backend without coupling to
/// implementation details.
///
/// Every operation is idempotent at the key level: re-putting a key
/// overwrites, deleting an absent key is a no-op.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload bytes to a specific storage key, overwriting any existing
    /// object.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Download an object by its storage key. Returns
    /// [`StorageError::NotFound`] when the key is absent.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a batch of keys, best-effort. Absent keys are a no-op;
    /// per-key failures are logged and do not fail the call unless the
    /// backend itself is unreachable.
    async fn delete_many(&self, keys: &[String]) -> StorageResult<()>;

    /// Generate a time-limited PUT URL scoped to a single key and content
    /// type, for browser-direct uploads.
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expected_size: u64,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// List objects under a prefix, one page at a time. Pass the returned
    /// `next_token` back in to continue.
    async fn list(&self, prefix: &str, continuation_token: Option<String>)
        -> StorageResult<ObjectPage>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
