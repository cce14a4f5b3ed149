//! Reference-counted reclamation on owner removal.
//!
//! Deleting an album or post removes its ledger rows; each previously
//! referenced asset is then deleted if and only if no other owner still
//! references it. The asset row goes first and its blobs second, so a crash
//! mid-way leaves a recoverable orphan in the blob store, never a row
//! pointing at missing blobs.

use std::sync::Arc;

use uuid::Uuid;

use atelier_core::AppError;
use atelier_db::{AlbumStore, AssetStore, OwnershipLedger, PostStore};
use atelier_storage::BlobStore;

/// Orchestrates owner deletion and the reclamation it triggers.
#[derive(Clone)]
pub struct ReclaimService {
    blobs: Arc<dyn BlobStore>,
    assets: Arc<dyn AssetStore>,
    ledger: Arc<dyn OwnershipLedger>,
    albums: Arc<dyn AlbumStore>,
    posts: Arc<dyn PostStore>,
}

impl ReclaimService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        assets: Arc<dyn AssetStore>,
        ledger: Arc<dyn OwnershipLedger>,
        albums: Arc<dyn AlbumStore>,
        posts: Arc<dyn PostStore>,
    ) -> Self {
        Self {
            blobs,
            assets,
            ledger,
            albums,
            posts,
        }
    }

    /// Delete an album, then reclaim any member asset left unreferenced.
    /// Returns the number of assets reclaimed.
    #[tracing::instrument(skip(self), fields(album_id = %id))]
    pub async fn delete_album(&self, id: Uuid) -> Result<usize, AppError> {
        let member_ids = self.ledger.album_asset_ids(id).await?;
        let deleted = self.albums.delete(id).await?;
        if !deleted {
            return Err(AppError::NotFound(format!("album {}", id)));
        }

        let reclaimed = self.reclaim_unreferenced(&member_ids).await;
        tracing::info!(album_id = %id, members = member_ids.len(), reclaimed, "Album deleted");
        Ok(reclaimed)
    }

    /// Delete a post, then reclaim any inline asset left unreferenced.
    /// Returns the number of assets reclaimed.
    #[tracing::instrument(skip(self), fields(post_id = %id))]
    pub async fn delete_post(&self, id: Uuid) -> Result<usize, AppError> {
        let inline_ids = self.ledger.post_asset_ids(id).await?;
        let deleted = self.posts.delete(id).await?;
        if !deleted {
            return Err(AppError::NotFound(format!("post {}", id)));
        }

        let reclaimed = self.reclaim_unreferenced(&inline_ids).await;
        tracing::info!(post_id = %id, inline = inline_ids.len(), reclaimed, "Post deleted");
        Ok(reclaimed)
    }

    /// Delete an asset outright, regardless of references. Ledger rows
    /// cascade with the row; blobs are removed afterwards.
    #[tracing::instrument(skip(self), fields(asset_id = %id))]
    pub async fn delete_asset(&self, id: Uuid) -> Result<(), AppError> {
        let asset = self
            .assets
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("asset {}", id)))?;

        let keys = asset.storage_keys();
        self.assets.delete(id).await?;

        if let Err(e) = self.blobs.delete_many(&keys).await {
            tracing::warn!(
                error = %e,
                asset_id = %id,
                "Failed to delete asset blobs; sweep will collect them"
            );
        }

        tracing::info!(asset_id = %id, keys = keys.len(), "Asset deleted");
        Ok(())
    }

    /// Reclaim each asset in the list that no owner references anymore.
    /// Per-asset failures are logged and skipped so one bad asset cannot
    /// block the rest.
    async fn reclaim_unreferenced(&self, asset_ids: &[Uuid]) -> usize {
        let mut reclaimed = 0;
        for &asset_id in asset_ids {
            match self.reclaim_if_unreferenced(asset_id).await {
                Ok(true) => reclaimed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        asset_id = %asset_id,
                        "Failed to reclaim asset, continuing"
                    );
                }
            }
        }
        reclaimed
    }

    /// Delete an asset's row and blobs when nothing references it. Returns
    /// whether the asset was reclaimed.
    pub async fn reclaim_if_unreferenced(&self, asset_id: Uuid) -> Result<bool, AppError> {
        if self.ledger.is_referenced(asset_id).await? {
            return Ok(false);
        }

        let Some(asset) = self.assets.get(asset_id).await? else {
            return Ok(false);
        };

        let keys = asset.storage_keys();
        self.assets.delete(asset_id).await?;

        if let Err(e) = self.blobs.delete_many(&keys).await {
            tracing::warn!(
                error = %e,
                asset_id = %asset_id,
                "Failed to delete reclaimed asset blobs; sweep will collect them"
            );
        }

        tracing::info!(asset_id = %asset_id, "Asset reclaimed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{IngestFile, IngestRequest, IngestService, MediaLimits};
    use crate::test_helpers::{jpeg_image, test_identity, InMemoryDb};
    use atelier_core::models::Asset;
    use atelier_storage::MemoryBlobStore;

    fn limits() -> MediaLimits {
        MediaLimits {
            max_upload_bytes: 10 * 1024 * 1024,
            large_max_mp: 25,
            upload_prefix: "uploads/".to_string(),
            allowed_content_types: vec!["image/jpeg".to_string()],
        }
    }

    fn reclaim_service(blobs: &Arc<MemoryBlobStore>, db: &Arc<InMemoryDb>) -> ReclaimService {
        ReclaimService::new(
            blobs.clone(),
            db.clone(),
            db.clone(),
            db.clone(),
            db.clone(),
        )
    }

    async fn ingest_asset(
        blobs: &Arc<MemoryBlobStore>,
        db: &Arc<InMemoryDb>,
        album_id: Option<Uuid>,
    ) -> Asset {
        let svc = IngestService::new(
            blobs.clone(),
            db.clone(),
            db.clone(),
            db.clone(),
            limits(),
        );
        let request = IngestRequest {
            files: vec![IngestFile {
                file_name: "photo.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
                data: jpeg_image(64, 64),
            }],
            album_id,
            caption: String::new(),
            alt_text: String::new(),
        };
        svc.ingest_batch(request, &test_identity())
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn test_multi_owner_asset_survives_until_last_owner_dies() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let album = db.create_test_album("x").await;
        let asset = ingest_asset(&blobs, &db, Some(album.id)).await;
        let post = db.create_test_post("y").await;
        db.set_post_assets(post.id, &[asset.id]).await.unwrap();

        let svc = reclaim_service(&blobs, &db);

        // Delete the post: the album still references the asset.
        let reclaimed = svc.delete_post(post.id).await.unwrap();
        assert_eq!(reclaimed, 0);
        assert!(atelier_db::AssetStore::get(&*db, asset.id).await.unwrap().is_some());
        assert_eq!(db.album_asset_ids(album.id).await.unwrap(), vec![asset.id]);

        // Delete the album: nothing references the asset anymore.
        let reclaimed = svc.delete_album(album.id).await.unwrap();
        assert_eq!(reclaimed, 1);
        assert!(atelier_db::AssetStore::get(&*db, asset.id).await.unwrap().is_none());
        assert_eq!(blobs.object_count(), 0);
    }

    #[tokio::test]
    async fn test_unowned_asset_is_not_touched_by_owner_deletion() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let album = db.create_test_album("x").await;
        let standalone = ingest_asset(&blobs, &db, None).await;
        let member = ingest_asset(&blobs, &db, Some(album.id)).await;

        let svc = reclaim_service(&blobs, &db);
        let reclaimed = svc.delete_album(album.id).await.unwrap();

        assert_eq!(reclaimed, 1);
        assert!(atelier_db::AssetStore::get(&*db, member.id).await.unwrap().is_none());
        // The standalone asset was never a member; it stays.
        assert!(atelier_db::AssetStore::get(&*db, standalone.id).await.unwrap().is_some());
        assert_eq!(blobs.object_count(), 3);
    }

    #[tokio::test]
    async fn test_delete_missing_owner_is_not_found() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let svc = reclaim_service(&blobs, &db);

        assert!(matches!(
            svc.delete_album(Uuid::new_v4()).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            svc.delete_post(Uuid::new_v4()).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_direct_asset_delete_removes_references_row_and_blobs() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let db = Arc::new(InMemoryDb::new());
        let album = db.create_test_album("x").await;
        let asset = ingest_asset(&blobs, &db, Some(album.id)).await;

        let svc = reclaim_service(&blobs, &db);
        svc.delete_asset(asset.id).await.unwrap();

        assert!(atelier_db::AssetStore::get(&*db, asset.id).await.unwrap().is_none());
        assert!(db.album_asset_ids(album.id).await.unwrap().is_empty());
        assert_eq!(blobs.object_count(), 0);
        // The album itself survives.
        assert!(db.album_exists(album.id).await);
    }
}
