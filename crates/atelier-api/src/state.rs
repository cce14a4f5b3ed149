//! Application state shared by every handler.

use std::sync::Arc;

use sqlx::PgPool;

use atelier_core::Config;
use atelier_db::AssetStore;
use atelier_services::{
    CatalogService, IngestService, MutationService, ReclaimService, ReconcileService,
};
use atelier_storage::BlobStore;

use crate::auth::IdentityProvider;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub blobs: Arc<dyn BlobStore>,
    pub assets: Arc<dyn AssetStore>,
    pub ingest: IngestService,
    pub mutations: MutationService,
    pub reclaim: ReclaimService,
    pub reconcile: Arc<ReconcileService>,
    pub catalog: CatalogService,
    pub identity: Arc<dyn IdentityProvider>,
}
