//! Album and post catalog operations.
//!
//! Thin orchestration over the repositories: field normalization, ordered
//! album listings, membership management, and inline-reference sync. The
//! presentation layer (markdown/shortcode rendering) is a read-only consumer
//! of these APIs.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use atelier_core::models::{Album, Asset, Identity, Post, PostStatus};
use atelier_core::AppError;
use atelier_db::{AlbumStore, AssetStore, OwnershipLedger, PostStore};

/// Fields accepted when creating or updating an album.
#[derive(Debug, Clone)]
pub struct AlbumInput {
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// Fields accepted when creating or updating a post.
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub markdown: String,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Orchestrates album/post CRUD and ledger maintenance.
#[derive(Clone)]
pub struct CatalogService {
    assets: Arc<dyn AssetStore>,
    ledger: Arc<dyn OwnershipLedger>,
    albums: Arc<dyn AlbumStore>,
    posts: Arc<dyn PostStore>,
}

impl CatalogService {
    pub fn new(
        assets: Arc<dyn AssetStore>,
        ledger: Arc<dyn OwnershipLedger>,
        albums: Arc<dyn AlbumStore>,
        posts: Arc<dyn PostStore>,
    ) -> Self {
        Self {
            assets,
            ledger,
            albums,
            posts,
        }
    }

    fn validate_album_input(input: &AlbumInput) -> Result<(String, String, String), AppError> {
        let title = input.title.trim().to_string();
        let slug = input.slug.trim().to_string();
        if title.is_empty() || slug.is_empty() {
            return Err(AppError::InvalidInput(
                "title and slug are required".to_string(),
            ));
        }
        Ok((title, slug, input.description.trim().to_string()))
    }

    pub async fn create_album(
        &self,
        input: AlbumInput,
        caller: &Identity,
    ) -> Result<Album, AppError> {
        let (title, slug, description) = Self::validate_album_input(&input)?;
        self.albums
            .create(&title, &slug, &description, Some(caller.id))
            .await
    }

    pub async fn update_album(&self, id: Uuid, input: AlbumInput) -> Result<Album, AppError> {
        let (title, slug, description) = Self::validate_album_input(&input)?;
        self.albums
            .update(id, &title, &slug, &description)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("album {}", id)))
    }

    pub async fn get_album(&self, id: Uuid) -> Result<Album, AppError> {
        self.albums
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("album {}", id)))
    }

    pub async fn get_album_by_slug(&self, slug: &str) -> Result<Album, AppError> {
        self.albums
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("album {}", slug)))
    }

    pub async fn list_albums(&self) -> Result<Vec<Album>, AppError> {
        self.albums.list().await
    }

    /// Member assets of an album, in album order.
    pub async fn list_album_assets(&self, album_id: Uuid) -> Result<Vec<Asset>, AppError> {
        self.get_album(album_id).await?;
        let ordered_ids = self.ledger.album_asset_ids(album_id).await?;
        let assets = self.assets.get_many(&ordered_ids).await?;

        // Bulk lookup returns arbitrary order; restore the ledger's.
        let mut by_id: HashMap<Uuid, Asset> =
            assets.into_iter().map(|a| (a.id, a)).collect();
        Ok(ordered_ids
            .into_iter()
            .filter_map(|id| by_id.remove(&id))
            .collect())
    }

    /// Append an existing asset to the end of an album.
    pub async fn add_album_asset(&self, album_id: Uuid, asset_id: Uuid) -> Result<(), AppError> {
        self.get_album(album_id).await?;
        self.assets
            .get(asset_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("asset {}", asset_id)))?;
        self.ledger.append_album_asset(album_id, asset_id).await
    }

    /// Remove an asset from an album. The asset itself stays in the library
    /// even if this was its last reference; only owner deletion cascades.
    pub async fn remove_album_asset(&self, album_id: Uuid, asset_id: Uuid) -> Result<(), AppError> {
        self.get_album(album_id).await?;
        self.ledger.remove_album_asset(album_id, asset_id).await
    }

    /// Rewrite an album's ordering to match the given id list.
    pub async fn reorder_album_assets(
        &self,
        album_id: Uuid,
        asset_ids: &[Uuid],
    ) -> Result<(), AppError> {
        self.get_album(album_id).await?;
        self.ledger.reorder_album_assets(album_id, asset_ids).await
    }

    fn validate_post_input(
        input: &PostInput,
    ) -> Result<(String, String, String, String, Option<DateTime<Utc>>), AppError> {
        let title = input.title.trim().to_string();
        let slug = input.slug.trim().to_string();
        let markdown = input.markdown.trim().to_string();
        if title.is_empty() || slug.is_empty() || markdown.is_empty() {
            return Err(AppError::InvalidInput(
                "title, slug, and markdown are required".to_string(),
            ));
        }
        let status: PostStatus = input
            .status
            .parse()
            .map_err(|e: anyhow::Error| AppError::InvalidInput(e.to_string()))?;
        Ok((
            title,
            slug,
            markdown,
            status.to_string(),
            input.published_at,
        ))
    }

    pub async fn create_post(&self, input: PostInput, caller: &Identity) -> Result<Post, AppError> {
        let (title, slug, markdown, status, published_at) = Self::validate_post_input(&input)?;
        self.posts
            .create(
                &title,
                &slug,
                input.summary.trim(),
                &markdown,
                &status,
                published_at,
                Some(caller.id),
            )
            .await
    }

    pub async fn update_post(&self, id: Uuid, input: PostInput) -> Result<Post, AppError> {
        let (title, slug, markdown, status, published_at) = Self::validate_post_input(&input)?;
        self.posts
            .update(
                id,
                &title,
                &slug,
                input.summary.trim(),
                &markdown,
                &status,
                published_at,
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", id)))
    }

    pub async fn get_post(&self, id: Uuid) -> Result<Post, AppError> {
        self.posts
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", id)))
    }

    pub async fn get_post_by_slug(&self, slug: &str) -> Result<Post, AppError> {
        self.posts
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", slug)))
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        self.posts.list().await
    }

    /// Replace a post's inline asset references. Unknown ids are dropped
    /// rather than rejected; stale embeds in old drafts are routine.
    pub async fn set_post_assets(&self, post_id: Uuid, asset_ids: &[Uuid]) -> Result<(), AppError> {
        self.get_post(post_id).await?;
        let existing = self.assets.get_many(asset_ids).await?;
        let known: Vec<Uuid> = existing.iter().map(|a| a.id).collect();
        self.ledger.set_post_assets(post_id, &known).await
    }

    pub async fn post_asset_ids(&self, post_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        self.get_post(post_id).await?;
        self.ledger.post_asset_ids(post_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{test_identity, InMemoryDb};

    fn catalog(db: &Arc<InMemoryDb>) -> CatalogService {
        CatalogService::new(db.clone(), db.clone(), db.clone(), db.clone())
    }

    fn album_input(title: &str, slug: &str) -> AlbumInput {
        AlbumInput {
            title: title.to_string(),
            slug: slug.to_string(),
            description: String::new(),
        }
    }

    fn post_input(title: &str, slug: &str) -> PostInput {
        PostInput {
            title: title.to_string(),
            slug: slug.to_string(),
            summary: String::new(),
            markdown: "# hello".to_string(),
            status: "draft".to_string(),
            published_at: None,
        }
    }

    #[tokio::test]
    async fn test_album_crud_round_trip() {
        let db = Arc::new(InMemoryDb::new());
        let svc = catalog(&db);

        let album = svc
            .create_album(album_input("  Travel  ", " travel "), &test_identity())
            .await
            .unwrap();
        assert_eq!(album.title, "Travel");
        assert_eq!(album.slug, "travel");

        let fetched = svc.get_album_by_slug("travel").await.unwrap();
        assert_eq!(fetched.id, album.id);

        let updated = svc
            .update_album(album.id, album_input("Travel 2024", "travel-2024"))
            .await
            .unwrap();
        assert_eq!(updated.slug, "travel-2024");
    }

    #[tokio::test]
    async fn test_album_requires_title_and_slug() {
        let db = Arc::new(InMemoryDb::new());
        let svc = catalog(&db);
        let err = svc
            .create_album(album_input("", "x"), &test_identity())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_duplicate_album_slug_conflicts() {
        let db = Arc::new(InMemoryDb::new());
        let svc = catalog(&db);
        svc.create_album(album_input("A", "same"), &test_identity())
            .await
            .unwrap();
        let err = svc
            .create_album(album_input("B", "same"), &test_identity())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_album_listing_keeps_ledger_order() {
        let db = Arc::new(InMemoryDb::new());
        let svc = catalog(&db);
        let album = svc
            .create_album(album_input("A", "a"), &test_identity())
            .await
            .unwrap();

        let a1 = db.create_test_asset("uploads/one.jpg").await;
        let a2 = db.create_test_asset("uploads/two.jpg").await;
        let a3 = db.create_test_asset("uploads/three.jpg").await;
        for id in [a1.id, a2.id, a3.id] {
            svc.add_album_asset(album.id, id).await.unwrap();
        }

        let listed = svc.list_album_assets(album.id).await.unwrap();
        assert_eq!(
            listed.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![a1.id, a2.id, a3.id]
        );

        svc.reorder_album_assets(album.id, &[a3.id, a1.id, a2.id])
            .await
            .unwrap();
        let listed = svc.list_album_assets(album.id).await.unwrap();
        assert_eq!(
            listed.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![a3.id, a1.id, a2.id]
        );
    }

    #[tokio::test]
    async fn test_removing_album_asset_keeps_asset_in_library() {
        let db = Arc::new(InMemoryDb::new());
        let svc = catalog(&db);
        let album = svc
            .create_album(album_input("A", "a"), &test_identity())
            .await
            .unwrap();
        let asset = db.create_test_asset("uploads/one.jpg").await;
        svc.add_album_asset(album.id, asset.id).await.unwrap();

        svc.remove_album_asset(album.id, asset.id).await.unwrap();
        assert!(svc.list_album_assets(album.id).await.unwrap().is_empty());
        assert!(atelier_db::AssetStore::get(&*db, asset.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_post_inline_sync_deduplicates_and_drops_unknown() {
        let db = Arc::new(InMemoryDb::new());
        let svc = catalog(&db);
        let post = svc
            .create_post(post_input("P", "p"), &test_identity())
            .await
            .unwrap();
        let asset = db.create_test_asset("uploads/one.jpg").await;

        svc.set_post_assets(post.id, &[asset.id, asset.id, Uuid::new_v4()])
            .await
            .unwrap();

        assert_eq!(svc.post_asset_ids(post.id).await.unwrap(), vec![asset.id]);
    }

    #[tokio::test]
    async fn test_post_status_is_validated() {
        let db = Arc::new(InMemoryDb::new());
        let svc = catalog(&db);
        let mut input = post_input("P", "p");
        input.status = "archived".to_string();
        let err = svc.create_post(input, &test_identity()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
