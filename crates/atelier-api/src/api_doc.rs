//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use atelier_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Atelier API",
        version = "0.1.0",
        description = "Media asset lifecycle API: image ingestion with derived variants, albums, posts, reference-counted reclamation, and storage reconciliation."
    ),
    paths(
        // Assets
        handlers::assets::list_assets,
        handlers::assets::get_asset,
        handlers::assets::ingest_assets,
        handlers::assets::update_asset,
        handlers::assets::delete_asset,
        handlers::assets::presign_upload,
        handlers::assets::register_assets,
        handlers::mutations::rotate_asset,
        handlers::mutations::crop_asset,
        handlers::mutations::replace_asset,
        // Albums
        handlers::albums::create_album,
        handlers::albums::list_albums,
        handlers::albums::get_album,
        handlers::albums::get_album_by_slug,
        handlers::albums::update_album,
        handlers::albums::delete_album,
        handlers::albums::list_album_assets,
        handlers::albums::add_album_asset,
        handlers::albums::remove_album_asset,
        handlers::albums::reorder_album_assets,
        // Posts
        handlers::posts::create_post,
        handlers::posts::list_posts,
        handlers::posts::get_post,
        handlers::posts::get_post_by_slug,
        handlers::posts::update_post,
        handlers::posts::delete_post,
        // Maintenance
        handlers::maintenance::reconcile,
    ),
    components(schemas(
        models::AssetResponse,
        models::AssetDetails,
        models::AlbumResponse,
        models::PostResponse,
        error::ErrorResponse,
        handlers::assets::AssetListResponse,
        handlers::assets::DeletedResponse,
        handlers::assets::PresignRequest,
        handlers::assets::PresignResponse,
        handlers::assets::RegisterRequest,
        handlers::assets::RegisterAssetPayload,
        handlers::mutations::RotateRequest,
        handlers::mutations::CropRequest,
        handlers::albums::AlbumPayload,
        handlers::albums::AddAlbumAssetRequest,
        handlers::albums::ReorderRequest,
        handlers::posts::PostPayload,
        handlers::maintenance::ReconcileResponse,
    )),
    tags(
        (name = "assets", description = "Asset lifecycle"),
        (name = "albums", description = "Albums and membership"),
        (name = "posts", description = "Posts and inline references"),
        (name = "maintenance", description = "Operational tasks")
    )
)]
pub struct ApiDoc;
