use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use atelier_core::models::Album;
use atelier_core::AppError;

use super::map_unique_violation;
use crate::traits::AlbumStore;

/// Postgres-backed album repository
#[derive(Clone)]
pub struct PgAlbumStore {
    pool: PgPool,
}

impl PgAlbumStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlbumStore for PgAlbumStore {
    #[tracing::instrument(skip(self), fields(db.table = "albums", db.operation = "insert"))]
    async fn create(
        &self,
        title: &str,
        slug: &str,
        description: &str,
        created_by: Option<Uuid>,
    ) -> Result<Album, AppError> {
        let now = Utc::now();
        let album = sqlx::query_as::<Postgres, Album>(
            r#"
            INSERT INTO albums (id, title, slug, description, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(slug)
        .bind(description)
        .bind(created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "album slug"))?;

        Ok(album)
    }

    #[tracing::instrument(skip(self), fields(db.table = "albums", db.operation = "update", album_id = %id))]
    async fn update(
        &self,
        id: Uuid,
        title: &str,
        slug: &str,
        description: &str,
    ) -> Result<Option<Album>, AppError> {
        let album = sqlx::query_as::<Postgres, Album>(
            r#"
            UPDATE albums
            SET title = $2, slug = $3, description = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(slug)
        .bind(description)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "album slug"))?;

        Ok(album)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Album>, AppError> {
        let album = sqlx::query_as::<Postgres, Album>("SELECT * FROM albums WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(album)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Album>, AppError> {
        let album = sqlx::query_as::<Postgres, Album>("SELECT * FROM albums WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(album)
    }

    async fn list(&self) -> Result<Vec<Album>, AppError> {
        let albums =
            sqlx::query_as::<Postgres, Album>("SELECT * FROM albums ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(albums)
    }

    #[tracing::instrument(skip(self), fields(db.table = "albums", db.operation = "delete", album_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM albums WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
