//! Batch reconciliation: delete blob-store objects no asset row references.
//!
//! The sweep lists everything under the upload prefix, subtracts the keys
//! referenced by any asset row (all four key columns, placeholder keys
//! included), and deletes the rest. A staleness guard skips objects modified
//! more recently than the configured threshold so the sweep never races an
//! in-flight ingestion whose row is not finalized yet. Deleting an absent
//! key is a no-op, so the sweep is safe to re-run at any time.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;

use atelier_core::AppError;
use atelier_db::AssetStore;
use atelier_storage::{keys, BlobStore};

/// Reconciliation sweep configuration.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    pub upload_prefix: String,
    /// Objects younger than this many hours are skipped. 0 disables the
    /// guard (useful in tests).
    pub stale_hours: i64,
}

/// The offline orphan sweep.
#[derive(Clone)]
pub struct ReconcileService {
    blobs: Arc<dyn BlobStore>,
    assets: Arc<dyn AssetStore>,
    config: ReconcileConfig,
}

impl ReconcileService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        assets: Arc<dyn AssetStore>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            blobs,
            assets,
            config,
        }
    }

    /// Start the periodic sweep. Returns a JoinHandle for graceful shutdown.
    pub fn start(self: Arc<Self>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(Duration::from_secs(interval_secs));

            loop {
                sweep_interval.tick().await;

                tracing::info!("Starting scheduled reconciliation sweep");

                match self.reconcile().await {
                    Ok(removed) => {
                        tracing::info!(removed, "Reconciliation sweep completed");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Reconciliation sweep failed");
                    }
                }
            }
        })
    }

    /// Run one sweep. Returns the number of objects removed.
    #[tracing::instrument(skip(self), fields(prefix = %self.config.upload_prefix))]
    pub async fn reconcile(&self) -> Result<usize, AppError> {
        let referenced = self.assets.all_storage_keys().await?;

        let cutoff = if self.config.stale_hours > 0 {
            Some(Utc::now() - chrono::Duration::hours(self.config.stale_hours))
        } else {
            None
        };

        let mut orphans: Vec<String> = Vec::new();
        let mut continuation_token = None;
        loop {
            let page = self
                .blobs
                .list(&self.config.upload_prefix, continuation_token)
                .await
                .map_err(|e| AppError::Storage(format!("listing objects: {}", e)))?;

            for obj in page.objects {
                let key = keys::normalize_key(&obj.key);
                if referenced.contains(&key) {
                    continue;
                }
                if let (Some(cutoff), Some(modified)) = (cutoff, obj.last_modified) {
                    if modified > cutoff {
                        tracing::debug!(key = %obj.key, "Skipping recently modified object");
                        continue;
                    }
                }
                orphans.push(obj.key);
            }

            match page.next_token {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }

        if orphans.is_empty() {
            tracing::info!("No orphan objects found");
            return Ok(0);
        }

        tracing::info!(count = orphans.len(), "Deleting orphan objects");
        self.blobs
            .delete_many(&orphans)
            .await
            .map_err(|e| AppError::Storage(format!("deleting orphans: {}", e)))?;

        Ok(orphans.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{jpeg_image, test_identity, InMemoryDb};
    use crate::{IngestFile, IngestRequest, IngestService, MediaLimits};
    use atelier_storage::MemoryBlobStore;

    fn sweep(blobs: &Arc<MemoryBlobStore>, db: &Arc<InMemoryDb>, stale_hours: i64) -> ReconcileService {
        ReconcileService::new(
            blobs.clone(),
            db.clone(),
            ReconcileConfig {
                upload_prefix: "uploads/".to_string(),
                stale_hours,
            },
        )
    }

    async fn ingest_one(blobs: &Arc<MemoryBlobStore>, db: &Arc<InMemoryDb>) {
        let svc = IngestService::new(
            blobs.clone(),
            db.clone(),
            db.clone(),
            db.clone(),
            MediaLimits {
                max_upload_bytes: 10 * 1024 * 1024,
                large_max_mp: 25,
                upload_prefix: "uploads/".to_string(),
                allowed_content_types: vec!["image/jpeg".to_string()],
            },
        );
        svc.ingest_batch(
            IngestRequest {
                files: vec![IngestFile {
                    file_name: "a.jpg".to_string(),
                    content_type: "image/jpeg".to_string(),
                    data: jpeg_image(64, 64),
                }],
                album_id: None,
                caption: String::new(),
                alt_text: String::new(),
            },
            &test_identity(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_sweep_removes_only_orphans() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        ingest_one(&blobs, &db).await;

        blobs
            .put("uploads/orphan-1.jpg", vec![1, 2], "image/jpeg")
            .await
            .unwrap();
        blobs
            .put("uploads/orphan-2.jpg", vec![3, 4], "image/jpeg")
            .await
            .unwrap();
        // Objects outside the upload prefix are never considered.
        blobs
            .put("backups/keep.jpg", vec![5], "image/jpeg")
            .await
            .unwrap();

        let removed = sweep(&blobs, &db, 0).reconcile().await.unwrap();
        assert_eq!(removed, 2);
        assert!(!blobs.has_key("uploads/orphan-1.jpg"));
        assert!(!blobs.has_key("uploads/orphan-2.jpg"));
        assert!(blobs.has_key("backups/keep.jpg"));
        // The ingested asset's three variants survive.
        assert_eq!(blobs.object_count(), 4);
    }

    #[tokio::test]
    async fn test_second_run_deletes_nothing() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        ingest_one(&blobs, &db).await;
        blobs
            .put("uploads/orphan.jpg", vec![1], "image/jpeg")
            .await
            .unwrap();

        let svc = sweep(&blobs, &db, 0);
        assert_eq!(svc.reconcile().await.unwrap(), 1);
        assert_eq!(svc.reconcile().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_staleness_guard_skips_fresh_objects() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());

        blobs
            .put("uploads/fresh.jpg", vec![1], "image/jpeg")
            .await
            .unwrap();
        blobs
            .put("uploads/old.jpg", vec![2], "image/jpeg")
            .await
            .unwrap();
        blobs.set_last_modified("uploads/old.jpg", Utc::now() - chrono::Duration::hours(48));

        let removed = sweep(&blobs, &db, 24).reconcile().await.unwrap();
        assert_eq!(removed, 1);
        assert!(blobs.has_key("uploads/fresh.jpg"));
        assert!(!blobs.has_key("uploads/old.jpg"));
    }

    #[tokio::test]
    async fn test_sweep_pages_through_listing() {
        let blobs = Arc::new(MemoryBlobStore::with_page_size(2));
        let db = Arc::new(InMemoryDb::new());

        for i in 0..7 {
            blobs
                .put(&format!("uploads/orphan-{}.jpg", i), vec![i], "image/jpeg")
                .await
                .unwrap();
        }

        let removed = sweep(&blobs, &db, 0).reconcile().await.unwrap();
        assert_eq!(removed, 7);
        assert_eq!(blobs.object_count(), 0);
    }

    #[tokio::test]
    async fn test_placeholder_keys_are_treated_as_referenced() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());

        // A provisional row mid-ingestion holds a placeholder key; even a
        // blob at that key (however unlikely) must not be swept.
        let placeholder = atelier_storage::placeholder_key("uploads/");
        db.create_provisional(&placeholder, None, None, "", "", None)
            .await
            .unwrap();
        blobs.put(&placeholder, vec![1], "image/jpeg").await.unwrap();

        let removed = sweep(&blobs, &db, 0).reconcile().await.unwrap();
        assert_eq!(removed, 0);
        assert!(blobs.has_key(&placeholder));
    }
}
