//! Shared key derivation for storage backends and lifecycle services.
//!
//! Variant sets are named from a stem: at ingestion the stem is the asset id
//! (so keys are deterministic given the row), at mutation it is a fresh
//! random UUID (so no reader ever sees a half-written variant set).

use uuid::Uuid;

/// The three derived-object keys of one variant set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantKeys {
    pub thumb: String,
    pub large: String,
    pub original: String,
}

impl VariantKeys {
    /// Derive the variant keys for a stem under the given upload prefix.
    /// Thumb and large are always JPEG; the original keeps its extension.
    pub fn for_stem(prefix: &str, stem: &str, original_ext: &str) -> Self {
        VariantKeys {
            thumb: format!("{}{}-thumb.jpg", prefix, stem),
            large: format!("{}{}-large.jpg", prefix, stem),
            original: format!("{}{}-original{}", prefix, stem, original_ext),
        }
    }

    /// Keys derived from an asset id (the ingestion path).
    pub fn for_asset(prefix: &str, asset_id: Uuid, original_ext: &str) -> Self {
        Self::for_stem(prefix, &asset_id.to_string(), original_ext)
    }

    /// Keys under a fresh random stem (the mutation path).
    pub fn fresh(prefix: &str, original_ext: &str) -> Self {
        Self::for_stem(prefix, &Uuid::new_v4().to_string(), original_ext)
    }

    pub fn as_vec(&self) -> Vec<String> {
        vec![self.thumb.clone(), self.large.clone(), self.original.clone()]
    }
}

/// Globally-unique placeholder key held by a provisional asset row before
/// its real keys are known.
pub fn placeholder_key(prefix: &str) -> String {
    format!("{}pending-{}", prefix, Uuid::new_v4())
}

/// Normalize a caller-supplied key: strip a leading slash and surrounding
/// whitespace, matching how keys are compared during reconciliation.
pub fn normalize_key(key: &str) -> String {
    key.trim().trim_start_matches('/').to_string()
}
