//! Atelier Storage Library
//!
//! Blob store gateway: the `BlobStore` trait plus S3, local-filesystem, and
//! in-memory implementations.
//!
//! # Storage key format
//!
//! All uploaded objects live under a configurable prefix (default
//! `uploads/`). A variant set is named from a stem: `{prefix}{stem}-thumb.jpg`,
//! `{prefix}{stem}-large.jpg`, `{prefix}{stem}-original{ext}`. Keys must not
//! contain `..` or a leading `/`. Key derivation is centralized in the
//! [`keys`] module so every caller stays consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use atelier_core::StorageBackend;
pub use factory::create_blob_store;
pub use keys::{placeholder_key, VariantKeys};
#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;
pub use traits::{BlobStore, ObjectInfo, ObjectPage, StorageError, StorageResult};
