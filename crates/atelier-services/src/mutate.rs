//! Mutation operations: rotate, replace, crop.
//!
//! All three share one shape: write the new variant set under a fresh random
//! stem, swap the row's pointers, and only then delete the old keys. A crash
//! between steps can leave an orphaned blob for the sweep to collect, but
//! never an asset pointing at missing blobs.
//!
//! Concurrent mutation of the same asset is not serialized; the row ends up
//! last-write-wins and every superseded variant set becomes sweepable.

use std::sync::Arc;

use uuid::Uuid;

use atelier_core::models::Asset;
use atelier_core::AppError;
use atelier_db::AssetStore;
use atelier_processing::{crop, derive_variants, rotate, CropRect};
use atelier_storage::{BlobStore, VariantKeys};

use crate::ingest::{IngestFile, MediaLimits};

/// Orchestrates in-place asset mutations.
#[derive(Clone)]
pub struct MutationService {
    blobs: Arc<dyn BlobStore>,
    assets: Arc<dyn AssetStore>,
    limits: MediaLimits,
}

impl MutationService {
    pub fn new(blobs: Arc<dyn BlobStore>, assets: Arc<dyn AssetStore>, limits: MediaLimits) -> Self {
        Self {
            blobs,
            assets,
            limits,
        }
    }

    /// Rotate an asset by 90, 180, or 270 degrees.
    #[tracing::instrument(skip(self), fields(asset_id = %id, degrees))]
    pub async fn rotate(&self, id: Uuid, degrees: u16) -> Result<Asset, AppError> {
        if !matches!(degrees, 90 | 180 | 270) {
            return Err(AppError::InvalidInput(
                "rotate must be 90, 180, or 270".to_string(),
            ));
        }

        let asset = self.get_asset(id).await?;
        let source = self.fetch_original(&asset).await?;
        let rotated =
            rotate(&source, degrees).map_err(|e| AppError::ImageProcessing(e.to_string()))?;

        self.swap_variants(asset, &rotated).await
    }

    /// Replace an asset's image with a caller-supplied file, keeping its
    /// identity and ledger references.
    #[tracing::instrument(skip(self, file), fields(asset_id = %id, file_name = %file.file_name))]
    pub async fn replace(&self, id: Uuid, file: IngestFile) -> Result<Asset, AppError> {
        if file.data.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "file {} is empty",
                file.file_name
            )));
        }
        if file.data.len() > self.limits.max_upload_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "file {} exceeds the {} MB limit",
                file.file_name,
                self.limits.max_upload_bytes / 1024 / 1024
            )));
        }
        if !self.limits.is_allowed_content_type(&file.content_type) {
            return Err(AppError::InvalidInput(format!(
                "file {}: unsupported type {}",
                file.file_name, file.content_type
            )));
        }

        let asset = self.get_asset(id).await?;
        self.swap_variants(asset, &file.data).await
    }

    /// Crop an asset to a rectangle within its original bounds.
    #[tracing::instrument(skip(self), fields(asset_id = %id))]
    pub async fn crop(&self, id: Uuid, rect: CropRect) -> Result<Asset, AppError> {
        let asset = self.get_asset(id).await?;
        let source = self.fetch_original(&asset).await?;
        let cropped = crop(&source, rect).map_err(|e| AppError::ImageProcessing(e.to_string()))?;

        self.swap_variants(asset, &cropped).await
    }

    async fn get_asset(&self, id: Uuid) -> Result<Asset, AppError> {
        self.assets
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("asset {}", id)))
    }

    /// Fetch the asset's original bytes, falling back to the primary key on
    /// legacy rows.
    async fn fetch_original(&self, asset: &Asset) -> Result<Vec<u8>, AppError> {
        self.blobs
            .get(asset.original_key())
            .await
            .map_err(|e| AppError::Storage(format!("fetching original: {}", e)))
    }

    /// Write-new → swap-pointer → delete-old.
    async fn swap_variants(&self, asset: Asset, source: &[u8]) -> Result<Asset, AppError> {
        let variants = derive_variants(source, self.limits.large_max_mp)
            .map_err(|e| AppError::ImageProcessing(e.to_string()))?;

        // Fresh stem: no read ever sees a half-written variant set, and
        // concurrent mutations on different assets can never collide.
        let new_keys = VariantKeys::fresh(&self.limits.upload_prefix, variants.original.extension);

        let uploads = [
            (&new_keys.thumb, variants.thumb.data, "image/jpeg"),
            (&new_keys.large, variants.large.data, "image/jpeg"),
            (
                &new_keys.original,
                variants.original.data,
                variants.original.content_type,
            ),
        ];
        let mut written: Vec<String> = Vec::with_capacity(3);
        for (key, data, content_type) in uploads {
            if let Err(e) = self.blobs.put(key, data, content_type).await {
                // The asset still points at its old keys; only the unused
                // new blobs need cleaning up.
                if let Err(cleanup_err) = self.blobs.delete_many(&written).await {
                    tracing::error!(
                        error = %cleanup_err,
                        asset_id = %asset.id,
                        "Failed to clean up unused variant blobs"
                    );
                }
                return Err(AppError::Storage(format!("uploading variant: {}", e)));
            }
            written.push(key.clone());
        }

        let old_keys = asset.storage_keys();
        let updated = self
            .assets
            .update_pointers(
                asset.id,
                &new_keys,
                variants.large.width as i32,
                variants.large.height as i32,
            )
            .await?;

        // Old keys are deleted only after the pointer swap committed.
        if let Err(e) = self.blobs.delete_many(&old_keys).await {
            tracing::warn!(
                error = %e,
                asset_id = %asset.id,
                "Failed to delete superseded variant blobs; sweep will collect them"
            );
        }

        tracing::info!(
            asset_id = %updated.id,
            width = updated.width,
            height = updated.height,
            "Asset variants swapped"
        );

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{IngestRequest, IngestService};
    use crate::test_helpers::{jpeg_image, test_identity, FlakyBlobStore, InMemoryDb};
    use atelier_storage::MemoryBlobStore;

    fn limits() -> MediaLimits {
        MediaLimits {
            max_upload_bytes: 10 * 1024 * 1024,
            large_max_mp: 25,
            upload_prefix: "uploads/".to_string(),
            allowed_content_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
        }
    }

    async fn ingest_asset(
        blobs: Arc<dyn BlobStore>,
        db: &Arc<InMemoryDb>,
        width: u32,
        height: u32,
    ) -> Asset {
        let svc = IngestService::new(blobs, db.clone(), db.clone(), db.clone(), limits());
        let request = IngestRequest {
            files: vec![IngestFile {
                file_name: "photo.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                data: jpeg_image(width, height),
            }],
            album_id: None,
            caption: String::new(),
            alt_text: String::new(),
        };
        svc.ingest_batch(request, &test_identity())
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn test_rotate_swaps_keys_and_dimensions() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let asset = ingest_asset(blobs.clone(), &db, 200, 100).await;
        let old_keys = asset.storage_keys();

        let svc = MutationService::new(blobs.clone(), db.clone(), limits());
        let rotated = svc.rotate(asset.id, 90).await.unwrap();

        assert_eq!(rotated.id, asset.id);
        assert_eq!((rotated.width, rotated.height), (Some(100), Some(200)));
        for old in &old_keys {
            assert!(!blobs.has_key(old), "old key {} should be gone", old);
        }
        for new in rotated.storage_keys() {
            assert!(blobs.has_key(&new), "new key {} should exist", new);
            assert!(!old_keys.contains(&new));
        }
        assert_eq!(blobs.object_count(), 3);
    }

    #[tokio::test]
    async fn test_rotate_rejects_invalid_angle() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let asset = ingest_asset(blobs.clone(), &db, 100, 100).await;

        let svc = MutationService::new(blobs.clone(), db.clone(), limits());
        let err = svc.rotate(asset.id, 45).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        // Nothing changed.
        assert_eq!(blobs.object_count(), 3);
    }

    #[tokio::test]
    async fn test_rotate_unknown_asset_is_not_found() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let svc = MutationService::new(blobs, db, limits());
        let err = svc.rotate(Uuid::new_v4(), 90).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_replace_keeps_identity() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let asset = ingest_asset(blobs.clone(), &db, 100, 100).await;

        let svc = MutationService::new(blobs.clone(), db.clone(), limits());
        let replaced = svc
            .replace(
                asset.id,
                IngestFile {
                    file_name: "new.jpg".to_string(),
                    content_type: "image/jpeg".to_string(),
                    data: jpeg_image(640, 480),
                },
            )
            .await
            .unwrap();

        assert_eq!(replaced.id, asset.id);
        assert_eq!((replaced.width, replaced.height), (Some(640), Some(480)));
        assert_ne!(replaced.key_primary, asset.key_primary);
        assert_eq!(blobs.object_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_asset_unchanged() {
        let inner = MemoryBlobStore::new();
        let db = Arc::new(InMemoryDb::new());
        let asset = ingest_asset(Arc::new(inner.clone()), &db, 100, 100).await;

        // Allow the rotate's source fetch, then fail the second variant put.
        let flaky = Arc::new(FlakyBlobStore::failing_after(inner.clone(), 1));
        let svc = MutationService::new(flaky, db.clone(), limits());
        let err = svc.rotate(asset.id, 90).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));

        let current = db.get(asset.id).await.unwrap().unwrap();
        assert_eq!(current.key_primary, asset.key_primary);
        for key in current.storage_keys() {
            assert!(inner.has_key(&key));
        }
        // No unused new blobs were left behind.
        assert_eq!(inner.object_count(), 3);
    }

    #[tokio::test]
    async fn test_crop_within_bounds() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let asset = ingest_asset(blobs.clone(), &db, 200, 200).await;

        let svc = MutationService::new(blobs.clone(), db.clone(), limits());
        let cropped = svc
            .crop(
                asset.id,
                CropRect {
                    x: 50,
                    y: 50,
                    width: 100,
                    height: 80,
                },
            )
            .await
            .unwrap();

        assert_eq!((cropped.width, cropped.height), (Some(100), Some(80)));
        assert_eq!(blobs.object_count(), 3);
    }

    #[tokio::test]
    async fn test_crop_out_of_bounds_rejected() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let asset = ingest_asset(blobs.clone(), &db, 100, 100).await;

        let svc = MutationService::new(blobs.clone(), db.clone(), limits());
        let err = svc
            .crop(
                asset.id,
                CropRect {
                    x: 90,
                    y: 0,
                    width: 50,
                    height: 50,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ImageProcessing(_)));
        assert_eq!(blobs.object_count(), 3);
    }
}
