//! Database repositories for the data access layer
//!
//! Repository traits live in [`traits`]; Postgres implementations in
//! [`postgres`]. Services depend on the traits so tests can swap in
//! in-memory fakes. No deletion cascades are decided here; reclamation is a
//! service-level concern; the only cascades in the schema are the ledger
//! rows' foreign keys.

pub mod postgres;
pub mod traits;

pub use postgres::{
    run_migrations, PgAlbumStore, PgAssetStore, PgOwnershipLedger, PgPostStore,
};
pub use traits::{AlbumStore, AssetStore, OwnershipLedger, PostStore};
