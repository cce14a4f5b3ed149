//! Post endpoints: CRUD and inline asset reference sync.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use atelier_core::models::PostResponse;
use atelier_core::AppError;
use atelier_services::catalog::PostInput;

use crate::auth::{Caller, RequireAuth};
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::assets::DeletedResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub markdown: String,
    #[serde(default = "default_status")]
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Asset ids embedded in the markdown, in any order. The embed order
    /// itself lives in the document text.
    #[serde(default)]
    pub asset_ids: Vec<Uuid>,
}

fn default_status() -> String {
    "draft".to_string()
}

impl PostPayload {
    fn input(&self) -> PostInput {
        PostInput {
            title: self.title.clone(),
            slug: self.slug.clone(),
            summary: self.summary.clone(),
            markdown: self.markdown.clone(),
            status: self.status.clone(),
            published_at: self.published_at,
        }
    }
}

/// Create a post and record its inline asset references.
#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "posts",
    request_body = PostPayload,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 409, description = "Slug already exists", body = ErrorResponse)
    )
)]
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    RequireAuth(caller): RequireAuth,
    Json(payload): Json<PostPayload>,
) -> Result<(StatusCode, Json<PostResponse>), HttpAppError> {
    let post = state.catalog.create_post(payload.input(), &caller).await?;
    state
        .catalog
        .set_post_assets(post.id, &payload.asset_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

/// List posts, newest first. Anonymous callers only see published posts.
#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "posts",
    responses((status = 200, description = "Posts", body = [PostResponse]))
)]
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
) -> Result<Json<Vec<PostResponse>>, HttpAppError> {
    let posts = state.catalog.list_posts().await?;
    let visible = posts
        .into_iter()
        .filter(|post| identity.is_some() || post.is_published())
        .map(PostResponse::from)
        .collect();
    Ok(Json(visible))
}

/// Fetch one post. Drafts are invisible to anonymous callers.
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post", body = PostResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<PostResponse>, HttpAppError> {
    let post = state.catalog.get_post(id).await?;
    if identity.is_none() && !post.is_published() {
        return Err(HttpAppError(AppError::NotFound(format!("post {}", id))));
    }
    Ok(Json(PostResponse::from(post)))
}

/// Fetch one post by slug.
#[utoipa::path(
    get,
    path = "/api/posts/slug/{slug}",
    tag = "posts",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post", body = PostResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn get_post_by_slug(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(slug): Path<String>,
) -> Result<Json<PostResponse>, HttpAppError> {
    let post = state.catalog.get_post_by_slug(&slug).await?;
    if identity.is_none() && !post.is_published() {
        return Err(HttpAppError(AppError::NotFound(format!("post {}", slug))));
    }
    Ok(Json(PostResponse::from(post)))
}

/// Update a post and resync its inline asset references.
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post id")),
    request_body = PostPayload,
    responses(
        (status = 200, description = "Updated post", body = PostResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostPayload>,
) -> Result<Json<PostResponse>, HttpAppError> {
    let post = state.catalog.update_post(id, payload.input()).await?;
    state
        .catalog
        .set_post_assets(post.id, &payload.asset_ids)
        .await?;
    Ok(Json(PostResponse::from(post)))
}

/// Delete a post. Inline assets left unreferenced are reclaimed.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "posts",
    params(("id" = Uuid, Path, description = "Post id")),
    responses(
        (status = 200, description = "Deleted", body = DeletedResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, HttpAppError> {
    state.reclaim.delete_post(id).await?;
    Ok(Json(DeletedResponse { status: "deleted" }))
}
