//! Maintenance endpoints.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::RequireAuth;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileResponse {
    /// Number of orphan objects removed from the blob store.
    pub removed: usize,
}

/// Run the storage-vs-metadata reconciliation sweep.
#[utoipa::path(
    post,
    path = "/api/maintenance/reconcile",
    tag = "maintenance",
    responses(
        (status = 200, description = "Sweep finished", body = ReconcileResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Sweep failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(operation = "reconcile"))]
pub async fn reconcile(
    State(state): State<Arc<AppState>>,
    RequireAuth(_caller): RequireAuth,
) -> Result<Json<ReconcileResponse>, HttpAppError> {
    let removed = state.reconcile.reconcile().await?;
    Ok(Json(ReconcileResponse { removed }))
}
