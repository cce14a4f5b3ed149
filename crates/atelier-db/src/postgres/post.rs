use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use atelier_core::models::Post;
use atelier_core::AppError;

use super::map_unique_violation;
use crate::traits::PostStore;

/// Postgres-backed post repository
#[derive(Clone)]
pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    #[tracing::instrument(skip(self, markdown), fields(db.table = "posts", db.operation = "insert"))]
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
        let now = Utc::now();
        let post = sqlx::query_as::<Postgres, Post>(
            r#"
            INSERT INTO posts (
                id, title, slug, summary, markdown, status, published_at,
                created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(slug)
        .bind(summary)
        .bind(markdown)
        .bind(status)
        .bind(published_at)
        .bind(created_by)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "post slug"))?;

        Ok(post)
    }

    #[tracing::instrument(skip(self, markdown), fields(db.table = "posts", db.operation = "update", post_id = %id))]
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
        let post = sqlx::query_as::<Postgres, Post>(
            r#"
            UPDATE posts
            SET title = $2, slug = $3, summary = $4, markdown = $5, status = $6,
                published_at = $7, updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(slug)
        .bind(summary)
        .bind(markdown)
        .bind(status)
        .bind(published_at)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "post slug"))?;

        Ok(post)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<Postgres, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<Postgres, Post>("SELECT * FROM posts WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn list(&self) -> Result<Vec<Post>, AppError> {
        let posts =
            sqlx::query_as::<Postgres, Post>("SELECT * FROM posts ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(posts)
    }

    #[tracing::instrument(skip(self), fields(db.table = "posts", db.operation = "delete", post_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
