//! Repository traits for asset metadata, albums, posts, and the ownership
//! ledger.
//!
//! The row is the source of truth for "what exists"; there is no process-wide
//! cache anywhere behind these traits, so callers always read current
//! pointers before acting on them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use atelier_core::models::{Album, Asset, AssetDetails, Post};
use atelier_core::AppError;
use atelier_storage::VariantKeys;

/// Metadata CRUD over asset rows.
///
/// Creation supports a **provisional** row: the caller does not yet know the
/// final storage keys (they depend on the assigned id), so creation accepts a
/// transient placeholder key and the row is updated in place once real keys
/// are known.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Create a provisional row holding a globally-unique placeholder key.
    async fn create_provisional(
        &self,
        placeholder_key: &str,
        width: Option<i32>,
        height: Option<i32>,
        caption: &str,
        alt_text: &str,
        created_by: Option<Uuid>,
    ) -> Result<Asset, AppError>;

    /// Create a finalized row pointing at an already-uploaded object
    /// (browser-direct upload registration). Only `key_primary` is set.
    async fn create_from_key(
        &self,
        key: &str,
        width: Option<i32>,
        height: Option<i32>,
        caption: &str,
        alt_text: &str,
        created_by: Option<Uuid>,
    ) -> Result<Asset, AppError>;

    /// Replace the placeholder with the real variant keys, setting
    /// `key_primary` to the large key.
    async fn finalize_keys(&self, id: Uuid, keys: &VariantKeys) -> Result<Asset, AppError>;

    /// Swap the row to a new variant set (mutation path).
    async fn update_pointers(
        &self,
        id: Uuid,
        keys: &VariantKeys,
        width: i32,
        height: i32,
    ) -> Result<Asset, AppError>;

    /// Update the free-text fields.
    async fn update_details(&self, id: Uuid, details: &AssetDetails) -> Result<Asset, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Asset>, AppError>;

    /// Bulk lookup. Rows come back in arbitrary order; callers re-order.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Asset>, AppError>;

    /// Admin listing, newest first.
    async fn list(&self) -> Result<Vec<Asset>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;

    /// Every storage key referenced by any row, across all four key columns.
    /// Input to the reconciliation sweep.
    async fn all_storage_keys(&self) -> Result<HashSet<String>, AppError>;
}

/// The ownership ledger: the only place that encodes "is this asset still
/// needed".
#[async_trait]
pub trait OwnershipLedger: Send + Sync {
    /// Append an album membership at the end of the album
    /// (`max(sort_order) + 1`, 0 when empty).
    async fn append_album_asset(&self, album_id: Uuid, asset_id: Uuid) -> Result<(), AppError>;

    async fn remove_album_asset(&self, album_id: Uuid, asset_id: Uuid) -> Result<(), AppError>;

    /// Asset ids of an album, ordered by `sort_order`, ties broken by asset
    /// id ascending.
    async fn album_asset_ids(&self, album_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Rewrite an album's sort orders to match the given list positions.
    async fn reorder_album_assets(&self, album_id: Uuid, asset_ids: &[Uuid])
        -> Result<(), AppError>;

    /// Replace a post's inline references with the given set (deduplicated).
    async fn set_post_assets(&self, post_id: Uuid, asset_ids: &[Uuid]) -> Result<(), AppError>;

    async fn post_asset_ids(&self, post_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Whether any album or post still references the asset.
    async fn is_referenced(&self, asset_id: Uuid) -> Result<bool, AppError>;
}

/// Album CRUD. Deleting an album removes its ledger rows (FK cascade) and
/// nothing else.
#[async_trait]
pub trait AlbumStore: Send + Sync {
    async fn create(
        &self,
        title: &str,
        slug: &str,
        description: &str,
        created_by: Option<Uuid>,
    ) -> Result<Album, AppError>;

    async fn update(
        &self,
        id: Uuid,
        title: &str,
        slug: &str,
        description: &str,
    ) -> Result<Option<Album>, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Album>, AppError>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Album>, AppError>;

    async fn list(&self) -> Result<Vec<Album>, AppError>;

    /// Returns true when a row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Post CRUD. Deleting a post removes its ledger rows (FK cascade) and
/// nothing else.
#[async_trait]
pub trait PostStore: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn create(
        &self,
        title: &str,
        slug: &str,
        summary: &str,
        markdown: &str,
        status: &str,
        published_at: Option<DateTime<Utc>>,
        created_by: Option<Uuid>,
    ) -> Result<Post, AppError>;

    #[allow(clippy::too_many_arguments)]
    async fn update(
        &self,
        id: Uuid,
        title: &str,
        slug: &str,
        summary: &str,
        markdown: &str,
        status: &str,
        published_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Post>, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Post>, AppError>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, AppError>;

    async fn list(&self) -> Result<Vec<Post>, AppError>;

    /// Returns true when a row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}
