use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use std::collections::HashSet;
use uuid::Uuid;

use atelier_core::models::{Asset, AssetDetails};
use atelier_core::AppError;
use atelier_storage::VariantKeys;

use super::map_unique_violation;
use crate::traits::AssetStore;

/// Postgres-backed asset repository
#[derive(Clone)]
pub struct PgAssetStore {
    pool: PgPool,
}

impl PgAssetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssetStore for PgAssetStore {
    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "insert"))]
    async fn create_provisional(
        &self,
        placeholder_key: &str,
        width: Option<i32>,
        height: Option<i32>,
        caption: &str,
        alt_text: &str,
        created_by: Option<Uuid>,
    ) -> Result<Asset, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let asset: Asset = sqlx::query_as::<Postgres, Asset>(
            r#"
            INSERT INTO assets (
                id, key_primary, width, height,
                caption, alt_text, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(placeholder_key)
        .bind(width)
        .bind(height)
        .bind(caption)
        .bind(alt_text)
        .bind(created_by)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "storage key"))?;

        Ok(asset)
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "insert"))]
    async fn create_from_key(
        &self,
        key: &str,
        width: Option<i32>,
        height: Option<i32>,
        caption: &str,
        alt_text: &str,
        created_by: Option<Uuid>,
    ) -> Result<Asset, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let asset: Asset = sqlx::query_as::<Postgres, Asset>(
            r#"
            INSERT INTO assets (
                id, key_primary, width, height,
                caption, alt_text, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(key)
        .bind(width)
        .bind(height)
        .bind(caption)
        .bind(alt_text)
        .bind(created_by)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "storage key"))?;

        Ok(asset)
    }

    #[tracing::instrument(skip(self, keys), fields(db.table = "assets", db.operation = "update", asset_id = %id))]
    async fn finalize_keys(&self, id: Uuid, keys: &VariantKeys) -> Result<Asset, AppError> {
        let asset: Option<Asset> = sqlx::query_as::<Postgres, Asset>(
            r#"
            UPDATE assets
            SET key_primary = $2, key_thumb = $3, key_large = $4, key_original = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&keys.large)
        .bind(&keys.thumb)
        .bind(&keys.large)
        .bind(&keys.original)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "storage key"))?;

        asset.ok_or_else(|| AppError::NotFound(format!("asset {}", id)))
    }

    #[tracing::instrument(skip(self, keys), fields(db.table = "assets", db.operation = "update", asset_id = %id))]
    async fn update_pointers(
        &self,
        id: Uuid,
        keys: &VariantKeys,
        width: i32,
        height: i32,
    ) -> Result<Asset, AppError> {
        let asset: Option<Asset> = sqlx::query_as::<Postgres, Asset>(
            r#"
            UPDATE assets
            SET key_primary = $2, key_thumb = $3, key_large = $4, key_original = $5,
                width = $6, height = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&keys.large)
        .bind(&keys.thumb)
        .bind(&keys.large)
        .bind(&keys.original)
        .bind(width)
        .bind(height)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "storage key"))?;

        asset.ok_or_else(|| AppError::NotFound(format!("asset {}", id)))
    }

    #[tracing::instrument(skip(self, details), fields(db.table = "assets", db.operation = "update", asset_id = %id))]
    async fn update_details(&self, id: Uuid, details: &AssetDetails) -> Result<Asset, AppError> {
        let asset: Option<Asset> = sqlx::query_as::<Postgres, Asset>(
            r#"
            UPDATE assets
            SET name = $2, caption = $3, alt_text = $4, description = $5, tags = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(details.name.trim())
        .bind(details.caption.trim())
        .bind(details.alt_text.trim())
        .bind(details.description.trim())
        .bind(details.tags.trim())
        .fetch_optional(&self.pool)
        .await?;

        asset.ok_or_else(|| AppError::NotFound(format!("asset {}", id)))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        let asset = sqlx::query_as::<Postgres, Asset>("SELECT * FROM assets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(asset)
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Asset>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let assets = sqlx::query_as::<Postgres, Asset>("SELECT * FROM assets WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(assets)
    }

    async fn list(&self) -> Result<Vec<Asset>, AppError> {
        let assets =
            sqlx::query_as::<Postgres, Asset>("SELECT * FROM assets ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(assets)
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "delete", asset_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn all_storage_keys(&self) -> Result<HashSet<String>, AppError> {
        let rows: Vec<(String, Option<String>, Option<String>, Option<String>)> =
            sqlx::query_as("SELECT key_primary, key_thumb, key_large, key_original FROM assets")
                .fetch_all(&self.pool)
                .await?;

        let mut keys = HashSet::new();
        for (primary, thumb, large, original) in rows {
            keys.insert(primary);
            for key in [thumb, large, original].into_iter().flatten() {
                keys.insert(key);
            }
        }
        Ok(keys)
    }
}
