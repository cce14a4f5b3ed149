//! Album endpoints: CRUD, ordered member listing, membership management.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use atelier_core::models::{AlbumResponse, AssetResponse};

use crate::auth::RequireAuth;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::assets::{AssetListResponse, DeletedResponse};
use crate::state::AppState;
use atelier_services::catalog::AlbumInput;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AlbumPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

impl From<AlbumPayload> for AlbumInput {
    fn from(payload: AlbumPayload) -> Self {
        AlbumInput {
            title: payload.title,
            slug: payload.slug,
            description: payload.description,
        }
    }
}

/// Create an album.
#[utoipa::path(
    post,
    path = "/api/albums",
    tag = "albums",
    request_body = AlbumPayload,
    responses(
        (status = 201, description = "Album created", body = AlbumResponse),
        (status = 409, description = "Slug already exists", body = ErrorResponse)
    )
)]
pub async fn create_album(
    State(state): State<Arc<AppState>>,
    RequireAuth(caller): RequireAuth,
    Json(payload): Json<AlbumPayload>,
) -> Result<(StatusCode, Json<AlbumResponse>), HttpAppError> {
    let album = state.catalog.create_album(payload.into(), &caller).await?;
    Ok((StatusCode::CREATED, Json(AlbumResponse::from(album))))
}

/// List albums, newest first.
#[utoipa::path(
    get,
    path = "/api/albums",
    tag = "albums",
    responses((status = 200, description = "All albums", body = [AlbumResponse]))
)]
pub async fn list_albums(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AlbumResponse>>, HttpAppError> {
    let albums = state.catalog.list_albums().await?;
    Ok(Json(albums.into_iter().map(AlbumResponse::from).collect()))
}

/// Fetch one album.
#[utoipa::path(
    get,
    path = "/api/albums/{id}",
    tag = "albums",
    params(("id" = Uuid, Path, description = "Album id")),
    responses(
        (status = 200, description = "Album", body = AlbumResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn get_album(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AlbumResponse>, HttpAppError> {
    let album = state.catalog.get_album(id).await?;
    Ok(Json(AlbumResponse::from(album)))
}

/// Fetch one album by slug (shortcode/markdown consumers resolve here).
#[utoipa::path(
    get,
    path = "/api/albums/slug/{slug}",
    tag = "albums",
    params(("slug" = String, Path, description = "Album slug")),
    responses(
        (status = 200, description = "Album", body = AlbumResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn get_album_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<AlbumResponse>, HttpAppError> {
    let album = state.catalog.get_album_by_slug(&slug).await?;
    Ok(Json(AlbumResponse::from(album)))
}

/// Update an album.
#[utoipa::path(
    put,
    path = "/api/albums/{id}",
    tag = "albums",
    params(("id" = Uuid, Path, description = "Album id")),
    request_body = AlbumPayload,
    responses(
        (status = 200, description = "Updated album", body = AlbumResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn update_album(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
    Path(id): Path<Uuid>,
    Json(payload): Json<AlbumPayload>,
) -> Result<Json<AlbumResponse>, HttpAppError> {
    let album = state.catalog.update_album(id, payload.into()).await?;
    Ok(Json(AlbumResponse::from(album)))
}

/// Delete an album. Member assets left unreferenced are reclaimed.
#[utoipa::path(
    delete,
    path = "/api/albums/{id}",
    tag = "albums",
    params(("id" = Uuid, Path, description = "Album id")),
    responses(
        (status = 200, description = "Deleted", body = DeletedResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn delete_album(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, HttpAppError> {
    state.reclaim.delete_album(id).await?;
    Ok(Json(DeletedResponse { status: "deleted" }))
}

/// List an album's assets in album order.
#[utoipa::path(
    get,
    path = "/api/albums/{id}/assets",
    tag = "albums",
    params(("id" = Uuid, Path, description = "Album id")),
    responses(
        (status = 200, description = "Member assets in order", body = AssetListResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn list_album_assets(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssetListResponse>, HttpAppError> {
    let assets = state.catalog.list_album_assets(id).await?;
    Ok(Json(AssetListResponse {
        assets: assets.into_iter().map(AssetResponse::from).collect(),
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddAlbumAssetRequest {
    pub asset_id: Uuid,
}

/// Append an existing asset to the end of an album.
#[utoipa::path(
    post,
    path = "/api/albums/{id}/assets",
    tag = "albums",
    params(("id" = Uuid, Path, description = "Album id")),
    request_body = AddAlbumAssetRequest,
    responses(
        (status = 204, description = "Asset appended"),
        (status = 404, description = "Album or asset not found", body = ErrorResponse)
    )
)]
pub async fn add_album_asset(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<AddAlbumAssetRequest>,
) -> Result<StatusCode, HttpAppError> {
    state.catalog.add_album_asset(id, request.asset_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove an asset from an album. The asset stays in the library.
#[utoipa::path(
    delete,
    path = "/api/albums/{id}/assets/{asset_id}",
    tag = "albums",
    params(
        ("id" = Uuid, Path, description = "Album id"),
        ("asset_id" = Uuid, Path, description = "Asset id")
    ),
    responses(
        (status = 204, description = "Membership removed"),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn remove_album_asset(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
    Path((id, asset_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, HttpAppError> {
    state.catalog.remove_album_asset(id, asset_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderRequest {
    pub asset_ids: Vec<Uuid>,
}

/// Rewrite an album's ordering to match the given id list.
#[utoipa::path(
    put,
    path = "/api/albums/{id}/assets/order",
    tag = "albums",
    params(("id" = Uuid, Path, description = "Album id")),
    request_body = ReorderRequest,
    responses(
        (status = 204, description = "Order updated"),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn reorder_album_assets(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<ReorderRequest>,
) -> Result<StatusCode, HttpAppError> {
    state
        .catalog
        .reorder_album_assets(id, &request.asset_ids)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
