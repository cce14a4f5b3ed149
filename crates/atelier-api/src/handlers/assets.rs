//! Asset endpoints: listing, ingestion, detail updates, deletion, and the
//! presigned direct-upload flow.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use atelier_core::models::{AssetDetails, AssetResponse};
use atelier_core::AppError;
use atelier_services::{IngestFile, IngestRequest};
use atelier_db::AssetStore;
use atelier_storage::{keys, BlobStore};

use crate::auth::RequireAuth;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct AssetListResponse {
    pub assets: Vec<AssetResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedResponse {
    pub status: &'static str,
}

/// List all assets, newest first.
#[utoipa::path(
    get,
    path = "/api/assets",
    tag = "assets",
    responses(
        (status = 200, description = "All assets", body = AssetListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_assets(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
) -> Result<Json<AssetListResponse>, HttpAppError> {
    let assets = state.assets.list().await?;
    Ok(Json(AssetListResponse {
        assets: assets.into_iter().map(AssetResponse::from).collect(),
    }))
}

/// Fetch one asset. Finalized assets are readable anonymously.
#[utoipa::path(
    get,
    path = "/api/assets/{id}",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    responses(
        (status = 200, description = "Asset", body = AssetResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn get_asset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssetResponse>, HttpAppError> {
    let asset = state
        .assets
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("asset {}", id)))?;
    Ok(Json(AssetResponse::from(asset)))
}

/// Ingest one or more image files (multipart `files`, optional `album_id`,
/// `caption`, `alt_text`).
#[utoipa::path(
    post,
    path = "/api/assets",
    tag = "assets",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Assets ingested", body = AssetListResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(operation = "ingest"))]
pub async fn ingest_assets(
    State(state): State<Arc<AppState>>,
    RequireAuth(caller): RequireAuth,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AssetListResponse>), HttpAppError> {
    // Reject oversized requests off the Content-Length header before the
    // body is buffered; the limit allows for multipart framing overhead.
    if let Some(length) = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
    {
        if length > state.config.max_request_bytes() {
            let max_mb = state.config.max_upload_bytes / 1024 / 1024;
            return Err(HttpAppError(AppError::PayloadTooLarge(format!(
                "request size exceeds {} MB limit",
                max_mb
            ))));
        }
    }

    let request = parse_ingest_multipart(multipart).await?;
    let assets = state.ingest.ingest_batch(request, &caller).await?;

    Ok((
        StatusCode::CREATED,
        Json(AssetListResponse {
            assets: assets.into_iter().map(AssetResponse::from).collect(),
        }),
    ))
}

async fn parse_ingest_multipart(mut multipart: Multipart) -> Result<IngestRequest, AppError> {
    let mut files = Vec::new();
    let mut album_id = None;
    let mut caption = String::new();
    let mut alt_text = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("image/jpeg")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("reading {}: {}", file_name, e)))?
                    .to_vec();
                // Browsers submit empty file inputs as zero-length parts.
                if !data.is_empty() {
                    files.push(IngestFile {
                        file_name,
                        content_type,
                        data,
                    });
                }
            }
            "album_id" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?;
                if !raw.trim().is_empty() {
                    album_id = Some(
                        Uuid::parse_str(raw.trim())
                            .map_err(|_| AppError::InvalidInput("invalid album_id".into()))?,
                    );
                }
            }
            "caption" => {
                caption = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?
                    .trim()
                    .to_string();
            }
            "alt_text" => {
                alt_text = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?
                    .trim()
                    .to_string();
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(IngestRequest {
        files,
        album_id,
        caption,
        alt_text,
    })
}

/// Update an asset's free-text details.
#[utoipa::path(
    put,
    path = "/api/assets/{id}",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    request_body = AssetDetails,
    responses(
        (status = 200, description = "Updated asset", body = AssetResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn update_asset(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
    Path(id): Path<Uuid>,
    Json(details): Json<AssetDetails>,
) -> Result<Json<AssetResponse>, HttpAppError> {
    let asset = state.assets.update_details(id, &details).await?;
    Ok(Json(AssetResponse::from(asset)))
}

/// Delete an asset outright, including its blobs and ledger rows.
#[utoipa::path(
    delete,
    path = "/api/assets/{id}",
    tag = "assets",
    params(("id" = Uuid, Path, description = "Asset id")),
    responses(
        (status = 200, description = "Deleted", body = DeletedResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn delete_asset(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, HttpAppError> {
    state.reclaim.delete_asset(id).await?;
    Ok(Json(DeletedResponse { status: "deleted" }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PresignRequest {
    pub file_name: String,
    pub content_type: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PresignResponse {
    pub upload_url: String,
    pub key: String,
}

/// Issue a presigned PUT URL for a browser-direct upload.
#[utoipa::path(
    post,
    path = "/api/assets/presign",
    tag = "assets",
    request_body = PresignRequest,
    responses(
        (status = 200, description = "Presigned upload URL", body = PresignResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    )
)]
pub async fn presign_upload(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
    Json(request): Json<PresignRequest>,
) -> Result<Json<PresignResponse>, HttpAppError> {
    let file_name = request.file_name.trim();
    let content_type = request.content_type.trim();
    if file_name.is_empty() || content_type.is_empty() {
        return Err(HttpAppError(AppError::InvalidInput(
            "file_name and content_type are required".into(),
        )));
    }
    if !state.config.is_allowed_content_type(content_type) {
        return Err(HttpAppError(AppError::InvalidInput(format!(
            "unsupported type {}",
            content_type
        ))));
    }
    if request.size > state.config.max_upload_bytes as u64 {
        return Err(HttpAppError(AppError::PayloadTooLarge(format!(
            "file exceeds the {} MB limit",
            state.config.max_upload_bytes / 1024 / 1024
        ))));
    }

    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_else(|| ".jpg".to_string());
    let key = format!("{}{}{}", state.config.upload_prefix, Uuid::new_v4(), ext);

    let upload_url = state
        .blobs
        .presign_put(
            &key,
            content_type,
            request.size,
            Duration::from_secs(state.config.presign_ttl_secs),
        )
        .await
        .map_err(AppError::from)?;

    Ok(Json(PresignResponse { upload_url, key }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterAssetPayload {
    pub key: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub alt_text: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub assets: Vec<RegisterAssetPayload>,
}

/// Register objects uploaded through presigned URLs as assets.
#[utoipa::path(
    post,
    path = "/api/assets/register",
    tag = "assets",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Assets registered", body = AssetListResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Key already registered", body = ErrorResponse)
    )
)]
pub async fn register_assets(
    State(state): State<Arc<AppState>>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AssetListResponse>), HttpAppError> {
    if request.assets.is_empty() {
        return Err(HttpAppError(AppError::InvalidInput(
            "assets array is required".into(),
        )));
    }

    let mut created = Vec::with_capacity(request.assets.len());
    for payload in request.assets {
        let key = keys::normalize_key(&payload.key);
        if key.is_empty() {
            return Err(HttpAppError(AppError::InvalidInput(
                "key is required for all assets".into(),
            )));
        }
        let asset = state
            .assets
            .create_from_key(
                &key,
                payload.width,
                payload.height,
                payload.caption.trim(),
                payload.alt_text.trim(),
                Some(caller.id),
            )
            .await?;
        created.push(AssetResponse::from(asset));
    }

    Ok((
        StatusCode::CREATED,
        Json(AssetListResponse { assets: created }),
    ))
}
