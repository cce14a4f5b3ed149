//! Postgres implementations of the repository traits.

mod album;
mod asset;
mod ledger;
mod post;

pub use album::PgAlbumStore;
pub use asset::PgAssetStore;
pub use ledger::PgOwnershipLedger;
pub use post::PgPostStore;

use atelier_core::AppError;
use sqlx::PgPool;

/// Run embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))
}

/// Map a sqlx error to `Conflict` when it is a unique-constraint violation,
/// `Database` otherwise. Storage-key collisions are effectively impossible
/// with random key generation but are checked defensively.
pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return AppError::Conflict(format!("{} already exists", what));
        }
    }
    AppError::Database(err)
}
