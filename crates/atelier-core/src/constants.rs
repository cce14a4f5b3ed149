//! Application-wide constants.

use uuid::Uuid;

/// Default admin identity used when authenticating with the static API token
/// and no explicit user id is configured. Deterministic UUID distinct from
/// Uuid::nil() to avoid confusion with uninitialized or sentinel values.
/// Format: a7c1e9d4-3f5b-4a8c-9e2d-6b0f1a3c5e7d
pub const DEFAULT_ADMIN_ID: Uuid = Uuid::from_u128(0xa7c1e9d4_3f5b_4a8c_9e2d_6b0f1a3c5e7d);

/// Default prefix under which every uploaded object lives in the blob store.
pub const DEFAULT_UPLOAD_PREFIX: &str = "uploads/";

/// Default per-file upload ceiling in bytes (100 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Multipart framing overhead tolerated by the Content-Length pre-check.
pub const CONTENT_LENGTH_OVERHEAD: f64 = 1.1;

/// Default total-pixel budget for the large variant, in megapixels.
pub const DEFAULT_LARGE_MAX_MP: u32 = 25;

/// Default lifetime of presigned upload URLs, in seconds.
pub const DEFAULT_PRESIGN_TTL_SECS: u64 = 600;

/// Default staleness guard for the reconciliation sweep, in hours. Objects
/// modified more recently than this are skipped so the sweep never races an
/// in-flight ingestion.
pub const DEFAULT_RECONCILE_STALE_HOURS: i64 = 24;
