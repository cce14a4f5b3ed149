//! In-memory implementation of every repository trait, behaving like the
//! Postgres schema: unique storage keys and slugs, ledger rows cascading
//! with their owners and assets.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use atelier_core::models::{Album, AlbumAssetRow, Asset, AssetDetails, Post};
use atelier_core::AppError;
use atelier_db::{AlbumStore, AssetStore, OwnershipLedger, PostStore};
use atelier_storage::VariantKeys;

#[derive(Default)]
struct State {
    assets: HashMap<Uuid, Asset>,
    albums: HashMap<Uuid, Album>,
    posts: HashMap<Uuid, Post>,
    album_assets: Vec<AlbumAssetRow>,
    post_assets: Vec<(Uuid, Uuid)>,
}

impl State {
    fn key_taken(&self, key: &str, except: Option<Uuid>) -> bool {
        self.assets.values().any(|a| {
            Some(a.id) != except
                && (a.key_primary == key
                    || a.key_thumb.as_deref() == Some(key)
                    || a.key_large.as_deref() == Some(key)
                    || a.key_original.as_deref() == Some(key))
        })
    }

    fn cascade_asset(&mut self, asset_id: Uuid) {
        self.album_assets.retain(|row| row.asset_id != asset_id);
        self.post_assets.retain(|(_, a)| *a != asset_id);
    }
}

/// Shared in-memory database; clone the `Arc` and use it as any of the four
/// repository traits.
pub struct InMemoryDb {
    state: Mutex<State>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn blank_asset(key: &str) -> Asset {
        Asset {
            id: Uuid::new_v4(),
            key_primary: key.to_string(),
            key_thumb: None,
            key_large: None,
            key_original: None,
            width: None,
            height: None,
            name: String::new(),
            caption: String::new(),
            alt_text: String::new(),
            description: String::new(),
            tags: String::new(),
            created_by: None,
            created_at: Utc::now(),
        }
    }

    /// Insert a finalized single-key asset directly (registration-style).
    pub async fn create_test_asset(&self, key: &str) -> Asset {
        let asset = Self::blank_asset(key);
        self.state
            .lock()
            .unwrap()
            .assets
            .insert(asset.id, asset.clone());
        asset
    }

    pub async fn create_test_album(&self, slug: &str) -> Album {
        let now = Utc::now();
        let album = Album {
            id: Uuid::new_v4(),
            title: slug.to_string(),
            slug: slug.to_string(),
            description: String::new(),
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .unwrap()
            .albums
            .insert(album.id, album.clone());
        album
    }

    pub async fn create_test_post(&self, slug: &str) -> Post {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: slug.to_string(),
            slug: slug.to_string(),
            summary: String::new(),
            markdown: "# test".to_string(),
            status: "draft".to_string(),
            published_at: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .unwrap()
            .posts
            .insert(post.id, post.clone());
        post
    }

    pub async fn asset_count(&self) -> usize {
        self.state.lock().unwrap().assets.len()
    }

    pub async fn album_exists(&self, id: Uuid) -> bool {
        self.state.lock().unwrap().albums.contains_key(&id)
    }
}

impl Default for InMemoryDb {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetStore for InMemoryDb {
    async fn create_provisional(
        &self,
        placeholder_key: &str,
        width: Option<i32>,
        height: Option<i32>,
        caption: &str,
        alt_text: &str,
        created_by: Option<Uuid>,
    ) -> Result<Asset, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.key_taken(placeholder_key, None) {
            return Err(AppError::Conflict("storage key already exists".to_string()));
        }
        let mut asset = Self::blank_asset(placeholder_key);
        asset.width = width;
        asset.height = height;
        asset.caption = caption.to_string();
        asset.alt_text = alt_text.to_string();
        asset.created_by = created_by;
        state.assets.insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn create_from_key(
        &self,
        key: &str,
        width: Option<i32>,
        height: Option<i32>,
        caption: &str,
        alt_text: &str,
        created_by: Option<Uuid>,
    ) -> Result<Asset, AppError> {
        self.create_provisional(key, width, height, caption, alt_text, created_by)
            .await
    }

    async fn finalize_keys(&self, id: Uuid, keys: &VariantKeys) -> Result<Asset, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.key_taken(&keys.large, Some(id)) {
            return Err(AppError::Conflict("storage key already exists".to_string()));
        }
        let asset = state
            .assets
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("asset {}", id)))?;
        asset.key_primary = keys.large.clone();
        asset.key_thumb = Some(keys.thumb.clone());
        asset.key_large = Some(keys.large.clone());
        asset.key_original = Some(keys.original.clone());
        Ok(asset.clone())
    }

    async fn update_pointers(
        &self,
        id: Uuid,
        keys: &VariantKeys,
        width: i32,
        height: i32,
    ) -> Result<Asset, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.key_taken(&keys.large, Some(id)) {
            return Err(AppError::Conflict("storage key already exists".to_string()));
        }
        let asset = state
            .assets
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("asset {}", id)))?;
        asset.key_primary = keys.large.clone();
        asset.key_thumb = Some(keys.thumb.clone());
        asset.key_large = Some(keys.large.clone());
        asset.key_original = Some(keys.original.clone());
        asset.width = Some(width);
        asset.height = Some(height);
        Ok(asset.clone())
    }

    async fn update_details(&self, id: Uuid, details: &AssetDetails) -> Result<Asset, AppError> {
        let mut state = self.state.lock().unwrap();
        let asset = state
            .assets
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("asset {}", id)))?;
        asset.name = details.name.trim().to_string();
        asset.caption = details.caption.trim().to_string();
        asset.alt_text = details.alt_text.trim().to_string();
        asset.description = details.description.trim().to_string();
        asset.tags = details.tags.trim().to_string();
        Ok(asset.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        Ok(self.state.lock().unwrap().assets.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Asset>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| state.assets.get(id).cloned())
            .collect())
    }

    async fn list(&self) -> Result<Vec<Asset>, AppError> {
        let state = self.state.lock().unwrap();
        let mut assets: Vec<Asset> = state.assets.values().cloned().collect();
        assets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(assets)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if state.assets.remove(&id).is_some() {
            state.cascade_asset(id);
        }
        Ok(())
    }

    async fn all_storage_keys(&self) -> Result<HashSet<String>, AppError> {
        let state = self.state.lock().unwrap();
        let mut keys = HashSet::new();
        for asset in state.assets.values() {
            keys.insert(asset.key_primary.clone());
            for key in [&asset.key_thumb, &asset.key_large, &asset.key_original]
                .into_iter()
                .flatten()
            {
                keys.insert(key.clone());
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl OwnershipLedger for InMemoryDb {
    async fn append_album_asset(&self, album_id: Uuid, asset_id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if state
            .album_assets
            .iter()
            .any(|row| row.album_id == album_id && row.asset_id == asset_id)
        {
            return Ok(());
        }
        let next = state
            .album_assets
            .iter()
            .filter(|row| row.album_id == album_id)
            .map(|row| row.sort_order + 1)
            .max()
            .unwrap_or(0);
        state.album_assets.push(AlbumAssetRow {
            album_id,
            asset_id,
            sort_order: next,
        });
        Ok(())
    }

    async fn remove_album_asset(&self, album_id: Uuid, asset_id: Uuid) -> Result<(), AppError> {
        self.state
            .lock()
            .unwrap()
            .album_assets
            .retain(|row| !(row.album_id == album_id && row.asset_id == asset_id));
        Ok(())
    }

    async fn album_asset_ids(&self, album_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<&AlbumAssetRow> = state
            .album_assets
            .iter()
            .filter(|row| row.album_id == album_id)
            .collect();
        rows.sort_by_key(|row| (row.sort_order, row.asset_id));
        Ok(rows.into_iter().map(|row| row.asset_id).collect())
    }

    async fn reorder_album_assets(
        &self,
        album_id: Uuid,
        asset_ids: &[Uuid],
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        for (position, asset_id) in asset_ids.iter().enumerate() {
            if let Some(row) = state
                .album_assets
                .iter_mut()
                .find(|row| row.album_id == album_id && row.asset_id == *asset_id)
            {
                row.sort_order = position as i32;
            }
        }
        Ok(())
    }

    async fn set_post_assets(&self, post_id: Uuid, asset_ids: &[Uuid]) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.post_assets.retain(|(p, _)| *p != post_id);
        let mut seen = HashSet::new();
        for &asset_id in asset_ids {
            if seen.insert(asset_id) && state.assets.contains_key(&asset_id) {
                state.post_assets.push((post_id, asset_id));
            }
        }
        Ok(())
    }

    async fn post_asset_ids(&self, post_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .post_assets
            .iter()
            .filter(|(p, _)| *p == post_id)
            .map(|(_, a)| *a)
            .collect())
    }

    async fn is_referenced(&self, asset_id: Uuid) -> Result<bool, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .album_assets
            .iter()
            .any(|row| row.asset_id == asset_id)
            || state.post_assets.iter().any(|(_, a)| *a == asset_id))
    }
}

#[async_trait]
impl AlbumStore for InMemoryDb {
    async fn create(
        &self,
        title: &str,
        slug: &str,
        description: &str,
        created_by: Option<Uuid>,
    ) -> Result<Album, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.albums.values().any(|a| a.slug == slug) {
            return Err(AppError::Conflict("album slug already exists".to_string()));
        }
        let now = Utc::now();
        let album = Album {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: description.to_string(),
            created_by,
            created_at: now,
            updated_at: now,
        };
        state.albums.insert(album.id, album.clone());
        Ok(album)
    }

    async fn update(
        &self,
        id: Uuid,
        title: &str,
        slug: &str,
        description: &str,
    ) -> Result<Option<Album>, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.albums.values().any(|a| a.slug == slug && a.id != id) {
            return Err(AppError::Conflict("album slug already exists".to_string()));
        }
        Ok(state.albums.get_mut(&id).map(|album| {
            album.title = title.to_string();
            album.slug = slug.to_string();
            album.description = description.to_string();
            album.updated_at = Utc::now();
            album.clone()
        }))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Album>, AppError> {
        Ok(self.state.lock().unwrap().albums.get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Album>, AppError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .albums
            .values()
            .find(|a| a.slug == slug)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Album>, AppError> {
        let state = self.state.lock().unwrap();
        let mut albums: Vec<Album> = state.albums.values().cloned().collect();
        albums.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(albums)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        let existed = state.albums.remove(&id).is_some();
        if existed {
            state.album_assets.retain(|row| row.album_id != id);
        }
        Ok(existed)
    }
}

#[async_trait]
impl PostStore for InMemoryDb {
    async fn create(
        &self,
        title: &str,
        slug: &str,
        summary: &str,
        markdown: &str,
        status: &str,
        published_at: Option<DateTime<Utc>>,
        created_by: Option<Uuid>,
    ) -> Result<Post, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.posts.values().any(|p| p.slug == slug) {
            return Err(AppError::Conflict("post slug already exists".to_string()));
        }
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
            summary: summary.to_string(),
            markdown: markdown.to_string(),
            status: status.to_string(),
            published_at,
            created_by,
            created_at: now,
            updated_at: now,
        };
        state.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(
        &self,
        id: Uuid,
        title: &str,
        slug: &str,
        summary: &str,
        markdown: &str,
        status: &str,
        published_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Post>, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.posts.values().any(|p| p.slug == slug && p.id != id) {
            return Err(AppError::Conflict("post slug already exists".to_string()));
        }
        Ok(state.posts.get_mut(&id).map(|post| {
            post.title = title.to_string();
            post.slug = slug.to_string();
            post.summary = summary.to_string();
            post.markdown = markdown.to_string();
            post.status = status.to_string();
            post.published_at = published_at;
            post.updated_at = Utc::now();
            post.clone()
        }))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        Ok(self.state.lock().unwrap().posts.get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, AppError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .posts
            .values()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Post>, AppError> {
        let state = self.state.lock().unwrap();
        let mut posts: Vec<Post> = state.posts.values().cloned().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        let existed = state.posts.remove(&id).is_some();
        if existed {
            state.post_assets.retain(|(p, _)| *p != id);
        }
        Ok(existed)
    }
}
