//! Asset mutation endpoints: rotate, crop, replace.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use atelier_core::models::AssetResponse;
use atelier_core::AppError;
use atelier_processing::CropRect;
use atelier_services::IngestFile;

use crate::auth::RequireAuth;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RotateRequest {
    pub degrees: u16,
}

/// Rotate an asset by 90, 180, or 270 degrees.
#[utoipa::path(
    patch,
    path = "/api/assets/{id}/rotate",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    request_body = RotateRequest,
    responses(
        (status = 200, description = "Rotated asset", body = AssetResponse),
        (status = 400, description = "Invalid angle", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(asset_id = %id, operation = "rotate"))]
pub async fn rotate_asset(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<RotateRequest>,
) -> Result<Json<AssetResponse>, HttpAppError> {
    let asset = state.mutations.rotate(id, request.degrees).await?;
    Ok(Json(AssetResponse::from(asset)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CropRequest {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Crop an asset to a rectangle within its original bounds.
#[utoipa::path(
    patch,
    path = "/api/assets/{id}/crop",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    request_body = CropRequest,
    responses(
        (status = 200, description = "Cropped asset", body = AssetResponse),
        (status = 400, description = "Rectangle out of bounds", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(asset_id = %id, operation = "crop"))]
pub async fn crop_asset(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<CropRequest>,
) -> Result<Json<AssetResponse>, HttpAppError> {
    let rect = CropRect {
        x: request.x,
        y: request.y,
        width: request.width,
        height: request.height,
    };
    let asset = state.mutations.crop(id, rect).await?;
    Ok(Json(AssetResponse::from(asset)))
}

/// Replace an asset's image with an uploaded file, keeping its identity.
#[utoipa::path(
    post,
    path = "/api/assets/{id}/replace",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Replaced asset", body = AssetResponse),
        (status = 400, description = "Invalid file", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(asset_id = %id, operation = "replace"))]
pub async fn replace_asset(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<AssetResponse>, HttpAppError> {
    let mut file: Option<IngestFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") && field.name() != Some("files") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or("image/jpeg").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("reading {}: {}", file_name, e)))?
            .to_vec();
        if !data.is_empty() {
            file = Some(IngestFile {
                file_name,
                content_type,
                data,
            });
            break;
        }
    }

    let file = file.ok_or_else(|| AppError::InvalidInput("a file is required".to_string()))?;
    let asset = state.mutations.replace(id, file).await?;
    Ok(Json(AssetResponse::from(asset)))
}
