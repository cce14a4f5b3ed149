//! In-memory blob store.
//!
//! Backs unit and service tests, and doubles as a throwaway dev backend.
//! Objects live in a process-local map; last-modified times are tracked so
//! the reconciliation staleness guard can be exercised.

use crate::traits::{BlobStore, ObjectInfo, ObjectPage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    #[allow(dead_code)]
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// In-memory blob store implementation
#[derive(Clone)]
pub struct MemoryBlobStore {
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
    page_size: usize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            page_size: 1000,
        }
    }

    /// Use a small page size to exercise listing pagination in tests.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Arc::new(Mutex::new(BTreeMap::new())),
            page_size: page_size.max(1),
        }
    }

    /// Check if a key exists (for test assertions)
    pub fn has_key(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    /// Number of stored objects (for test assertions)
    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// All stored keys, sorted (for test assertions)
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Backdate or postdate an object's last-modified time (for staleness
    /// guard tests).
    pub fn set_last_modified(&self, key: &str, when: DateTime<Utc>) {
        if let Some(obj) = self.objects.lock().unwrap().get_mut(key) {
            obj.last_modified = when;
        }
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|obj| obj.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete_many(&self, keys: &[String]) -> StorageResult<()> {
        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn presign_put(
        &self,
        key: &str,
        _content_type: &str,
        _expected_size: u64,
        expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!(
            "memory://presigned/{}?expires={}",
            key,
            expires_in.as_secs()
        ))
    }

    async fn list(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> StorageResult<ObjectPage> {
        let offset = match continuation_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StorageError::ListFailed(format!("bad continuation token {}", token)))?,
            None => 0,
        };

        let objects = self.objects.lock().unwrap();
        let matching: Vec<ObjectInfo> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ObjectInfo {
                key: key.clone(),
                last_modified: Some(obj.last_modified),
            })
            .collect();

        let page: Vec<ObjectInfo> = matching
            .iter()
            .skip(offset)
            .take(self.page_size)
            .cloned()
            .collect();
        let next_token = if offset + page.len() < matching.len() {
            Some((offset + page.len()).to_string())
        } else {
            None
        };

        Ok(ObjectPage {
            objects: page,
            next_token,
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryBlobStore::new();
        store.put("uploads/a", vec![1], "image/jpeg").await.unwrap();
        store.put("uploads/a", vec![2], "image/jpeg").await.unwrap();
        assert_eq!(store.get("uploads/a").await.unwrap(), vec![2]);
        assert_eq!(store.object_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_many_ignores_absent_keys() {
        let store = MemoryBlobStore::new();
        store.put("uploads/a", vec![1], "image/jpeg").await.unwrap();
        let keys = vec!["uploads/a".to_string(), "uploads/ghost".to_string()];
        store.delete_many(&keys).await.unwrap();
        store.delete_many(&keys).await.unwrap();
        assert_eq!(store.object_count(), 0);
    }

    #[tokio::test]
    async fn test_list_paginates() {
        let store = MemoryBlobStore::with_page_size(2);
        for i in 0..5 {
            store
                .put(&format!("uploads/obj-{}", i), vec![i], "image/jpeg")
                .await
                .unwrap();
        }
        store.put("other/x", vec![9], "image/jpeg").await.unwrap();

        let mut seen = Vec::new();
        let mut token = None;
        loop {
            let page = store.list("uploads/", token).await.unwrap();
            seen.extend(page.objects.into_iter().map(|o| o.key));
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        assert_eq!(seen.len(), 5);
        assert!(seen.iter().all(|k| k.starts_with("uploads/")));
    }
}
