use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashSet;
use uuid::Uuid;

use atelier_core::AppError;

use crate::traits::OwnershipLedger;

/// Postgres-backed ownership ledger over the `album_assets` and
/// `post_assets` join tables.
#[derive(Clone)]
pub struct PgOwnershipLedger {
    pool: PgPool,
}

impl PgOwnershipLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OwnershipLedger for PgOwnershipLedger {
    #[tracing::instrument(skip(self), fields(db.table = "album_assets", db.operation = "insert"))]
    async fn append_album_asset(&self, album_id: Uuid, asset_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO album_assets (album_id, asset_id, sort_order)
            SELECT $1, $2, COALESCE(MAX(sort_order) + 1, 0)
            FROM album_assets WHERE album_id = $1
            ON CONFLICT (album_id, asset_id) DO NOTHING
            "#,
        )
        .bind(album_id)
        .bind(asset_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_album_asset(&self, album_id: Uuid, asset_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM album_assets WHERE album_id = $1 AND asset_id = $2")
            .bind(album_id)
            .bind(asset_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn album_asset_ids(&self, album_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT asset_id FROM album_assets
            WHERE album_id = $1
            ORDER BY sort_order ASC, asset_id ASC
            "#,
        )
        .bind(album_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("asset_id")).collect())
    }

    #[tracing::instrument(skip(self, asset_ids), fields(db.table = "album_assets", db.operation = "update"))]
    async fn reorder_album_assets(
        &self,
        album_id: Uuid,
        asset_ids: &[Uuid],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for (position, asset_id) in asset_ids.iter().enumerate() {
            sqlx::query(
                "UPDATE album_assets SET sort_order = $3 WHERE album_id = $1 AND asset_id = $2",
            )
            .bind(album_id)
            .bind(asset_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, asset_ids), fields(db.table = "post_assets", db.operation = "replace"))]
    async fn set_post_assets(&self, post_id: Uuid, asset_ids: &[Uuid]) -> Result<(), AppError> {
        let unique: Vec<Uuid> = {
            let mut seen = HashSet::new();
            asset_ids
                .iter()
                .copied()
                .filter(|id| seen.insert(*id))
                .collect()
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM post_assets WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        for asset_id in unique {
            sqlx::query(
                r#"
                INSERT INTO post_assets (post_id, asset_id)
                SELECT $1, $2 WHERE EXISTS (SELECT 1 FROM assets WHERE id = $2)
                "#,
            )
            .bind(post_id)
            .bind(asset_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn post_asset_ids(&self, post_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let rows = sqlx::query("SELECT asset_id FROM post_assets WHERE post_id = $1")
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("asset_id")).collect())
    }

    async fn is_referenced(&self, asset_id: Uuid) -> Result<bool, AppError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM album_assets WHERE asset_id = $1
                UNION ALL
                SELECT 1 FROM post_assets WHERE asset_id = $1
            ) AS referenced
            "#,
        )
        .bind(asset_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<bool, _>("referenced"))
    }
}
