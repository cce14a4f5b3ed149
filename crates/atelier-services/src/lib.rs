//! Atelier Services Library
//!
//! The media asset lifecycle: ingestion, mutation (rotate/replace/crop),
//! reclamation on owner deletion, and the storage-vs-metadata reconciliation
//! sweep. Services depend on the repository traits and the blob store trait
//! so the whole lifecycle is testable against in-memory fakes.

pub mod catalog;
pub mod ingest;
pub mod mutate;
pub mod reclaim;
pub mod reconcile;
pub mod test_helpers;

pub use catalog::CatalogService;
pub use ingest::{IngestFile, IngestRequest, IngestService, MediaLimits};
pub use mutate::MutationService;
pub use reclaim::ReclaimService;
pub use reconcile::{ReconcileConfig, ReconcileService};
