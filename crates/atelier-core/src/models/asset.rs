use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One stored image with up to three derived variants plus metadata.
///
/// `key_primary` is always non-empty and globally unique; the three variant
/// keys may be absent on legacy rows, in which case `key_primary` stands in
/// for all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Asset {
    pub id: Uuid,
    pub key_primary: String,
    pub key_thumb: Option<String>,
    pub key_large: Option<String>,
    pub key_original: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub name: String,
    pub caption: String,
    pub alt_text: String,
    pub description: String,
    pub tags: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// Key of the thumbnail variant, falling back to the primary key on
    /// legacy rows.
    pub fn thumb_key(&self) -> &str {
        self.key_thumb.as_deref().unwrap_or(&self.key_primary)
    }

    /// Key of the large (general-purpose display) variant.
    pub fn large_key(&self) -> &str {
        self.key_large.as_deref().unwrap_or(&self.key_primary)
    }

    /// Key of the untouched original.
    pub fn original_key(&self) -> &str {
        self.key_original.as_deref().unwrap_or(&self.key_primary)
    }

    /// Every distinct storage key this row points at. Used when retiring the
    /// row's blobs; deduplicated so legacy single-key rows delete once.
    pub fn storage_keys(&self) -> Vec<String> {
        let mut keys = vec![self.key_primary.clone()];
        for key in [&self.key_thumb, &self.key_large, &self.key_original]
            .into_iter()
            .flatten()
        {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }
}

/// Free-text fields editable after ingestion.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AssetDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssetResponse {
    pub id: Uuid,
    pub key: String,
    pub key_thumb: String,
    pub key_large: String,
    pub key_original: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub name: String,
    pub caption: String,
    pub alt_text: String,
    pub description: String,
    pub tags: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Asset> for AssetResponse {
    fn from(asset: Asset) -> Self {
        AssetResponse {
            id: asset.id,
            key: asset.key_primary.clone(),
            key_thumb: asset.thumb_key().to_string(),
            key_large: asset.large_key().to_string(),
            key_original: asset.original_key().to_string(),
            width: asset.width,
            height: asset.height,
            name: asset.name,
            caption: asset.caption,
            alt_text: asset.alt_text,
            description: asset.description,
            tags: asset.tags,
            created_by: asset.created_by,
            created_at: asset.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_asset() -> Asset {
        Asset {
            id: Uuid::new_v4(),
            key_primary: "uploads/legacy.jpg".to_string(),
            key_thumb: None,
            key_large: None,
            key_original: None,
            width: Some(640),
            height: Some(480),
            name: String::new(),
            caption: String::new(),
            alt_text: String::new(),
            description: String::new(),
            tags: String::new(),
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_legacy_rows_fall_back_to_primary_key() {
        let asset = legacy_asset();
        assert_eq!(asset.thumb_key(), "uploads/legacy.jpg");
        assert_eq!(asset.large_key(), "uploads/legacy.jpg");
        assert_eq!(asset.original_key(), "uploads/legacy.jpg");
        assert_eq!(asset.storage_keys(), vec!["uploads/legacy.jpg".to_string()]);
    }

    #[test]
    fn test_storage_keys_deduplicates_primary() {
        let mut asset = legacy_asset();
        asset.key_thumb = Some("uploads/a-thumb.jpg".to_string());
        asset.key_large = Some(asset.key_primary.clone());
        asset.key_original = Some("uploads/a-original.png".to_string());

        let keys = asset.storage_keys();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&"uploads/legacy.jpg".to_string()));
        assert!(keys.contains(&"uploads/a-thumb.jpg".to_string()));
        assert!(keys.contains(&"uploads/a-original.png".to_string()));
    }

    #[test]
    fn test_response_exposes_resolved_variant_keys() {
        let mut asset = legacy_asset();
        asset.key_thumb = Some("uploads/a-thumb.jpg".to_string());
        let response = AssetResponse::from(asset.clone());
        assert_eq!(response.key_thumb, "uploads/a-thumb.jpg");
        assert_eq!(response.key_large, asset.key_primary);
    }
}
