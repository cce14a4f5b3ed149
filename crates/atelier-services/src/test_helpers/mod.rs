//! Test helpers: in-memory repository fakes, a fault-injecting blob store,
//! and fixture image builders.
//!
//! These ship as a normal module (not `#[cfg(test)]`) so integration tests
//! and dependent crates' tests can reuse them without a database.

mod fixtures;
mod memory_db;

pub use fixtures::{jpeg_image, png_image, test_identity};
pub use memory_db::InMemoryDb;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use atelier_storage::{BlobStore, ObjectPage, StorageBackend, StorageError, StorageResult};

/// Blob store wrapper that fails every `put` after the first N succeed.
/// Reads, deletes, and listings pass through untouched.
pub struct FlakyBlobStore<S: BlobStore> {
    inner: S,
    allowed_puts: usize,
    puts: AtomicUsize,
}

impl<S: BlobStore> FlakyBlobStore<S> {
    pub fn failing_after(inner: S, allowed_puts: usize) -> Self {
        Self {
            inner,
            allowed_puts,
            puts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<S: BlobStore> BlobStore for FlakyBlobStore<S> {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        let seen = self.puts.fetch_add(1, Ordering::SeqCst);
        if seen >= self.allowed_puts {
            return Err(StorageError::PutFailed(format!(
                "injected failure on put #{} ({})",
                seen + 1,
                key
            )));
        }
        self.inner.put(key, data, content_type).await
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.inner.get(key).await
    }

    async fn delete_many(&self, keys: &[String]) -> StorageResult<()> {
        self.inner.delete_many(keys).await
    }

    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expected_size: u64,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.inner
            .presign_put(key, content_type, expected_size, expires_in)
            .await
    }

    async fn list(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> StorageResult<ObjectPage> {
        self.inner.list(prefix, continuation_token).await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}
