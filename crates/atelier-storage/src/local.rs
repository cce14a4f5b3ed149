use crate::traits::{BlobStore, ObjectInfo, ObjectPage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem blob store implementation
#[derive(Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    /// Create a new LocalBlobStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for object storage (e.g., "/var/lib/atelier/blobs")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalBlobStore { base_path })
    }

    /// Convert storage key to filesystem path with traversal validation.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(key))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn walk_dir_sync(
        dir: &Path,
        base: &Path,
        prefix: &str,
        out: &mut Vec<ObjectInfo>,
    ) -> std::io::Result<()> {
        if !dir.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                Self::walk_dir_sync(&path, base, prefix, out)?;
            } else {
                let key = path
                    .strip_prefix(base)
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                if !key.starts_with(prefix) {
                    continue;
                }
                let last_modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .map(DateTime::<Utc>::from);
                out.push(ObjectInfo { key, last_modified });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::PutFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::PutFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::PutFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        fs::read(&path).await.map_err(|e| {
            StorageError::GetFailed(format!("Failed to read file {}: {}", path.display(), e))
        })
    }

    async fn delete_many(&self, keys: &[String]) -> StorageResult<()> {
        for key in keys {
            let path = match self.key_to_path(key) {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping invalid key in delete_many");
                    continue;
                }
            };
            match fs::remove_file(&path).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to delete local object");
                }
            }
        }
        Ok(())
    }

    async fn presign_put(
        &self,
        _key: &str,
        _content_type: &str,
        _expected_size: u64,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Err(StorageError::ConfigError(
            "Presigned uploads are only supported by the S3 backend".to_string(),
        ))
    }

    async fn list(
        &self,
        prefix: &str,
        _continuation_token: Option<String>,
    ) -> StorageResult<ObjectPage> {
        let base = self.base_path.clone();
        let prefix = prefix.to_string();

        let objects = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            Self::walk_dir_sync(&base, &base, &prefix, &mut out)?;
            out.sort_by(|a, b| a.key.cmp(&b.key));
            Ok::<_, std::io::Error>(out)
        })
        .await
        .map_err(|e| StorageError::ListFailed(e.to_string()))?
        .map_err(|e| StorageError::ListFailed(e.to_string()))?;

        // The whole listing fits in one page for a filesystem backend.
        Ok(ObjectPage {
            objects,
            next_token: None,
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (tempfile::TempDir, LocalBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let (_dir, store) = test_store().await;
        store
            .put("uploads/a-thumb.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();
        let data = store.get("uploads/a-thumb.jpg").await.unwrap();
        assert_eq!(data, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_dir, store) = test_store().await;
        let err = store.get("uploads/missing.jpg").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_many_is_idempotent() {
        let (_dir, store) = test_store().await;
        store
            .put("uploads/a.jpg", vec![1], "image/jpeg")
            .await
            .unwrap();
        let keys = vec!["uploads/a.jpg".to_string(), "uploads/absent.jpg".to_string()];
        store.delete_many(&keys).await.unwrap();
        // Deleting the same keys again is a no-op, not an error.
        store.delete_many(&keys).await.unwrap();
        assert!(matches!(
            store.get("uploads/a.jpg").await.unwrap_err(),
            StorageError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_traversal_keys_are_rejected() {
        let (_dir, store) = test_store().await;
        let err = store
            .put("../escape.jpg", vec![1], "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
        let err = store.get("/absolute.jpg").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let (_dir, store) = test_store().await;
        store
            .put("uploads/a.jpg", vec![1], "image/jpeg")
            .await
            .unwrap();
        store
            .put("uploads/b.jpg", vec![2], "image/jpeg")
            .await
            .unwrap();
        store.put("other/c.jpg", vec![3], "image/jpeg").await.unwrap();

        let page = store.list("uploads/", None).await.unwrap();
        let keys: Vec<_> = page.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["uploads/a.jpg", "uploads/b.jpg"]);
        assert!(page.next_token.is_none());
        assert!(page.objects.iter().all(|o| o.last_modified.is_some()));
    }
}
