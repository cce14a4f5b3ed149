//! Route configuration and middleware layering.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, patch, post, put},
    Json, Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use atelier_core::Config;

use crate::api_doc::ApiDoc;
use crate::handlers::{albums, assets, maintenance, mutations, posts};
use crate::state::AppState;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router> {
    let cors = setup_cors(config)?;

    let api = Router::new()
        // Assets
        .route("/api/assets", get(assets::list_assets).post(assets::ingest_assets))
        .route(
            "/api/assets/{id}",
            get(assets::get_asset)
                .put(assets::update_asset)
                .delete(assets::delete_asset),
        )
        .route("/api/assets/presign", post(assets::presign_upload))
        .route("/api/assets/register", post(assets::register_assets))
        .route("/api/assets/{id}/rotate", patch(mutations::rotate_asset))
        .route("/api/assets/{id}/crop", patch(mutations::crop_asset))
        .route("/api/assets/{id}/replace", post(mutations::replace_asset))
        // Albums
        .route("/api/albums", get(albums::list_albums).post(albums::create_album))
        .route(
            "/api/albums/{id}",
            get(albums::get_album)
                .put(albums::update_album)
                .delete(albums::delete_album),
        )
        .route("/api/albums/slug/{slug}", get(albums::get_album_by_slug))
        .route(
            "/api/albums/{id}/assets",
            get(albums::list_album_assets).post(albums::add_album_asset),
        )
        .route(
            "/api/albums/{id}/assets/order",
            put(albums::reorder_album_assets),
        )
        .route(
            "/api/albums/{id}/assets/{asset_id}",
            axum::routing::delete(albums::remove_album_asset),
        )
        // Posts
        .route("/api/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/api/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/api/posts/slug/{slug}", get(posts::get_post_by_slug))
        // Maintenance
        .route("/api/maintenance/reconcile", post(maintenance::reconcile))
        .with_state(state);

    let rapidoc: Router = utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
        .path("/docs")
        .into();

    let app = Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(rapidoc)
        .merge(api)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit()))
        .layer(DefaultBodyLimit::max(config.max_request_bytes()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Ok(app)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn http_concurrency_limit() -> usize {
    std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1)
}

fn setup_cors(config: &Config) -> Result<CorsLayer> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
    ];

    if config.cors_origins.iter().any(|origin| origin == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(Any))
}
