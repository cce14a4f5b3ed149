//! Application setup and initialization
//!
//! All initialization logic lives here instead of main.rs.

pub mod routes;
pub mod server;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;

use atelier_core::Config;
use atelier_db::{
    run_migrations, PgAlbumStore, PgAssetStore, PgOwnershipLedger, PgPostStore,
};
use atelier_services::{
    CatalogService, IngestService, MediaLimits, MutationService, ReclaimService, ReconcileConfig,
    ReconcileService,
};
use atelier_storage::{create_blob_store, BlobStore as _};

use crate::auth::StaticTokenProvider;
use crate::state::AppState;
use atelier_core::models::Identity;

/// Initialize the entire application: database, storage, services, routes.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database ready");

    let blobs = create_blob_store(&config)
        .await
        .context("Failed to initialize blob store")?;
    tracing::info!(backend = %blobs.backend_type(), "Blob store ready");

    let assets = Arc::new(PgAssetStore::new(pool.clone()));
    let ledger = Arc::new(PgOwnershipLedger::new(pool.clone()));
    let albums = Arc::new(PgAlbumStore::new(pool.clone()));
    let posts = Arc::new(PgPostStore::new(pool.clone()));

    let limits = MediaLimits {
        max_upload_bytes: config.max_upload_bytes,
        large_max_mp: config.large_image_max_mp,
        upload_prefix: config.upload_prefix.clone(),
        allowed_content_types: config.allowed_content_types.clone(),
    };

    let identity = Arc::new(StaticTokenProvider::new(
        config.api_token.clone(),
        Identity {
            id: config.api_user_id,
            email: config.api_user_email.clone(),
        },
    ));

    let state = Arc::new(AppState {
        ingest: IngestService::new(
            blobs.clone(),
            assets.clone(),
            ledger.clone(),
            albums.clone(),
            limits.clone(),
        ),
        mutations: MutationService::new(blobs.clone(), assets.clone(), limits),
        reclaim: ReclaimService::new(
            blobs.clone(),
            assets.clone(),
            ledger.clone(),
            albums.clone(),
            posts.clone(),
        ),
        reconcile: Arc::new(ReconcileService::new(
            blobs.clone(),
            assets.clone(),
            ReconcileConfig {
                upload_prefix: config.upload_prefix.clone(),
                stale_hours: config.reconcile_stale_hours,
            },
        )),
        catalog: CatalogService::new(
            assets.clone(),
            ledger.clone(),
            albums.clone(),
            posts.clone(),
        ),
        identity,
        blobs,
        assets,
        pool,
        config,
    });

    let router = routes::setup_routes(&state.config, state.clone())?;

    Ok((state, router))
}
