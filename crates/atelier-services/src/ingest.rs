//! Ingestion pipeline: validate → process → create-record → upload-variants
//! → finalize-record, with rollback from any non-terminal step.
//!
//! Per-file state machine: `Validating → Processing → RecordCreated →
//! BlobsUploaded → Finalized`, with a terminal `RolledBack` reachable from
//! any non-terminal state. Files in a batch are processed one at a time to
//! bound peak memory and keep rollback scoping simple; a file's rollback
//! never touches previously finalized files.

use std::sync::Arc;

use uuid::Uuid;

use atelier_core::models::{Asset, Identity};
use atelier_core::AppError;
use atelier_db::{AlbumStore, AssetStore, OwnershipLedger};
use atelier_processing::derive_variants;
use atelier_storage::{keys, BlobStore, VariantKeys};

/// Size and content-type limits applied during validation.
#[derive(Debug, Clone)]
pub struct MediaLimits {
    pub max_upload_bytes: usize,
    pub large_max_mp: u32,
    pub upload_prefix: String,
    pub allowed_content_types: Vec<String>,
}

impl MediaLimits {
    pub fn is_allowed_content_type(&self, content_type: &str) -> bool {
        let normalized = content_type.to_lowercase();
        self.allowed_content_types.iter().any(|ct| ct == &normalized)
    }
}

/// One file of an ingestion batch.
#[derive(Debug, Clone)]
pub struct IngestFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// An ingestion request: one or more files plus optional owner context.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub files: Vec<IngestFile>,
    pub album_id: Option<Uuid>,
    pub caption: String,
    pub alt_text: String,
}

/// Pipeline stages, used for tracing and rollback scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IngestStage {
    Validating,
    Processing,
    RecordCreated,
    BlobsUploaded,
    Finalized,
    RolledBack,
}

/// Orchestrates the upload lifecycle for one batch of files.
#[derive(Clone)]
pub struct IngestService {
    blobs: Arc<dyn BlobStore>,
    assets: Arc<dyn AssetStore>,
    ledger: Arc<dyn OwnershipLedger>,
    albums: Arc<dyn AlbumStore>,
    limits: MediaLimits,
}

impl IngestService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        assets: Arc<dyn AssetStore>,
        ledger: Arc<dyn OwnershipLedger>,
        albums: Arc<dyn AlbumStore>,
        limits: MediaLimits,
    ) -> Self {
        Self {
            blobs,
            assets,
            ledger,
            albums,
            limits,
        }
    }

    pub fn limits(&self) -> &MediaLimits {
        &self.limits
    }

    /// Ingest a batch of files sequentially.
    ///
    /// A failure aborts the batch: later files are not processed, but files
    /// already finalized stay finalized (they are reachable through their
    /// album or the asset listing even though this call returns an error).
    #[tracing::instrument(skip(self, request, caller), fields(files = request.files.len(), album_id = ?request.album_id))]
    pub async fn ingest_batch(
        &self,
        request: IngestRequest,
        caller: &Identity,
    ) -> Result<Vec<Asset>, AppError> {
        if request.files.is_empty() {
            return Err(AppError::InvalidInput(
                "at least one file is required".to_string(),
            ));
        }

        // Resolve the owning album up front so a bad id fails before any
        // file is touched.
        if let Some(album_id) = request.album_id {
            self.albums
                .get(album_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("album {}", album_id)))?;
        }

        let mut finalized = Vec::with_capacity(request.files.len());
        for file in request.files {
            let asset = self
                .ingest_one(
                    file,
                    request.album_id,
                    &request.caption,
                    &request.alt_text,
                    caller,
                )
                .await?;
            finalized.push(asset);
        }
        Ok(finalized)
    }

    /// Run one file through the pipeline.
    async fn ingest_one(
        &self,
        file: IngestFile,
        album_id: Option<Uuid>,
        caption: &str,
        alt_text: &str,
        caller: &Identity,
    ) -> Result<Asset, AppError> {
        tracing::debug!(stage = ?IngestStage::Validating, file_name = %file.file_name, "Ingest stage");
        self.validate(&file)?;

        tracing::debug!(stage = ?IngestStage::Processing, file_name = %file.file_name, "Ingest stage");
        let variants = derive_variants(&file.data, self.limits.large_max_mp)
            .map_err(|e| AppError::ImageProcessing(format!("{}: {}", file.file_name, e)))?;

        tracing::debug!(stage = ?IngestStage::RecordCreated, file_name = %file.file_name, "Ingest stage");
        let placeholder = keys::placeholder_key(&self.limits.upload_prefix);
        let provisional = self
            .assets
            .create_provisional(
                &placeholder,
                Some(variants.large.width as i32),
                Some(variants.large.height as i32),
                caption,
                alt_text,
                Some(caller.id),
            )
            .await?;

        // Final keys are derived from the assigned id so the row and its
        // blobs can always be matched up.
        let variant_keys = VariantKeys::for_asset(
            &self.limits.upload_prefix,
            provisional.id,
            variants.original.extension,
        );

        tracing::debug!(stage = ?IngestStage::BlobsUploaded, asset_id = %provisional.id, "Ingest stage");
        let uploads = [
            (&variant_keys.thumb, variants.thumb.data, "image/jpeg"),
            (&variant_keys.large, variants.large.data, "image/jpeg"),
            (
                &variant_keys.original,
                variants.original.data,
                variants.original.content_type,
            ),
        ];
        let mut written: Vec<String> = Vec::with_capacity(3);
        for (key, data, content_type) in uploads {
            if let Err(e) = self.blobs.put(key, data, content_type).await {
                self.rollback(IngestStage::BlobsUploaded, provisional.id, &written)
                    .await;
                return Err(AppError::Storage(format!(
                    "uploading {}: {}",
                    file.file_name, e
                )));
            }
            written.push(key.clone());
        }

        let asset = match self.assets.finalize_keys(provisional.id, &variant_keys).await {
            Ok(asset) => asset,
            Err(e) => {
                self.rollback(IngestStage::Finalized, provisional.id, &written)
                    .await;
                return Err(e);
            }
        };
        tracing::debug!(stage = ?IngestStage::Finalized, asset_id = %asset.id, "Ingest stage");

        if let Some(album_id) = album_id {
            self.ledger.append_album_asset(album_id, asset.id).await?;
        }

        tracing::info!(
            asset_id = %asset.id,
            file_name = %file.file_name,
            width = variants.large.width,
            height = variants.large.height,
            "Asset ingested"
        );

        Ok(asset)
    }

    fn validate(&self, file: &IngestFile) -> Result<(), AppError> {
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
        Ok(())
    }

    /// Compensate a failed pipeline run: delete whatever blobs this run
    /// wrote, then the provisional row. Best-effort: the reconciliation
    /// sweep is the durable backstop for anything missed here.
    async fn rollback(&self, stage: IngestStage, asset_id: Uuid, written: &[String]) {
        tracing::warn!(
            asset_id = %asset_id,
            stage = ?stage,
            written = written.len(),
            "Rolling back ingestion"
        );

        if !written.is_empty() {
            if let Err(e) = self.blobs.delete_many(written).await {
                tracing::error!(error = %e, asset_id = %asset_id, "Rollback blob cleanup failed");
            }
        }
        if let Err(e) = self.assets.delete(asset_id).await {
            tracing::error!(error = %e, asset_id = %asset_id, "Rollback row cleanup failed");
        }
        tracing::debug!(stage = ?IngestStage::RolledBack, asset_id = %asset_id, "Ingest stage");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{jpeg_image, test_identity, FlakyBlobStore, InMemoryDb};
    use atelier_storage::MemoryBlobStore;

    fn limits() -> MediaLimits {
        MediaLimits {
            max_upload_bytes: 10 * 1024 * 1024,
            large_max_mp: 25,
            upload_prefix: "uploads/".to_string(),
            allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
                "image/bmp".to_string(),
            ],
        }
    }

    fn service(blobs: Arc<dyn BlobStore>, db: &Arc<InMemoryDb>) -> IngestService {
        IngestService::new(blobs, db.clone(), db.clone(), db.clone(), limits())
    }

    fn request(files: Vec<IngestFile>, album_id: Option<Uuid>) -> IngestRequest {
        IngestRequest {
            files,
            album_id,
            caption: String::new(),
            alt_text: String::new(),
        }
    }

    fn jpeg_file(name: &str, width: u32, height: u32) -> IngestFile {
        IngestFile {
            file_name: name.to_string(),
            content_type: "image/jpeg".to_string(),
            data: jpeg_image(width, height),
        }
    }

    #[tokio::test]
    async fn test_ingest_without_album_creates_unreferenced_asset() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let svc = service(blobs.clone(), &db);

        let assets = svc
            .ingest_batch(request(vec![jpeg_file("photo.jpg", 800, 600)], None), &test_identity())
            .await
            .unwrap();

        assert_eq!(assets.len(), 1);
        let asset = &assets[0];
        assert_eq!(asset.width, Some(800));
        assert_eq!(asset.height, Some(600));
        assert_eq!(asset.key_primary, asset.large_key());
        assert!(asset.thumb_key().ends_with("-thumb.jpg"));
        assert!(asset.original_key().contains(&asset.id.to_string()));
        assert_eq!(blobs.object_count(), 3);
        assert!(!db.is_referenced(asset.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_ingest_with_album_appends_ledger_row() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let svc = service(blobs.clone(), &db);
        let album = db.create_test_album("travel").await;

        let first = svc
            .ingest_batch(
                request(vec![jpeg_file("a.jpg", 100, 100)], Some(album.id)),
                &test_identity(),
            )
            .await
            .unwrap();
        let second = svc
            .ingest_batch(
                request(vec![jpeg_file("b.jpg", 100, 100)], Some(album.id)),
                &test_identity(),
            )
            .await
            .unwrap();

        let ordered = db.album_asset_ids(album.id).await.unwrap();
        assert_eq!(ordered, vec![first[0].id, second[0].id]);
    }

    #[tokio::test]
    async fn test_ingest_unknown_album_fails_before_any_side_effect() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let svc = service(blobs.clone(), &db);

        let err = svc
            .ingest_batch(
                request(vec![jpeg_file("a.jpg", 100, 100)], Some(Uuid::new_v4())),
                &test_identity(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(blobs.object_count(), 0);
        assert!(db.asset_count().await == 0);
    }

    #[tokio::test]
    async fn test_validation_rejects_empty_oversized_and_wrong_type() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let svc = service(blobs.clone(), &db);

        let empty = IngestFile {
            file_name: "empty.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: Vec::new(),
        };
        let err = svc
            .ingest_batch(request(vec![empty], None), &test_identity())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let oversized = IngestFile {
            file_name: "big.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![0u8; 11 * 1024 * 1024],
        };
        let err = svc
            .ingest_batch(request(vec![oversized], None), &test_identity())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));

        let wrong_type = IngestFile {
            file_name: "movie.mp4".to_string(),
            content_type: "video/mp4".to_string(),
            data: vec![1, 2, 3],
        };
        let err = svc
            .ingest_batch(request(vec![wrong_type], None), &test_identity())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        assert_eq!(blobs.object_count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_rolls_back_with_nothing_to_undo() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let svc = service(blobs.clone(), &db);

        let corrupt = IngestFile {
            file_name: "broken.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let err = svc
            .ingest_batch(request(vec![corrupt], None), &test_identity())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ImageProcessing(_)));
        assert_eq!(blobs.object_count(), 0);
        assert_eq!(db.asset_count().await, 0);
    }

    #[tokio::test]
    async fn test_upload_failure_rolls_back_blobs_and_row() {
        let inner = MemoryBlobStore::new();
        // First put succeeds, second fails: the pipeline must delete the
        // blob it wrote and the provisional row.
        let blobs = Arc::new(FlakyBlobStore::failing_after(inner.clone(), 1));
        let db = Arc::new(InMemoryDb::new());
        let svc = service(blobs, &db);

        let err = svc
            .ingest_batch(request(vec![jpeg_file("a.jpg", 100, 100)], None), &test_identity())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(inner.object_count(), 0);
        assert_eq!(db.asset_count().await, 0);
    }

    #[tokio::test]
    async fn test_batch_failure_keeps_earlier_finalized_files() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let svc = service(blobs.clone(), &db);
        let album = db.create_test_album("mixed").await;

        let oversized = IngestFile {
            file_name: "big.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: vec![0u8; 11 * 1024 * 1024],
        };
        let batch = request(
            vec![
                jpeg_file("first.jpg", 100, 100),
                oversized,
                jpeg_file("third.jpg", 100, 100),
            ],
            Some(album.id),
        );

        let err = svc.ingest_batch(batch, &test_identity()).await.unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));

        // File 1 was finalized before the failure and is never rolled back;
        // file 3 was never processed.
        assert_eq!(db.asset_count().await, 1);
        assert_eq!(blobs.object_count(), 3);
        assert_eq!(db.album_asset_ids(album.id).await.unwrap().len(), 1);
    }
}
