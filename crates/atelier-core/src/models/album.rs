use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Named, sluggable collection with an ordered many-to-many relation to
/// assets. Membership lives in the ownership ledger, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Album {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One ordered album membership row. Ties on `sort_order` are broken by
/// `asset_id` ascending when listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AlbumAssetRow {
    pub album_id: Uuid,
    pub asset_id: Uuid,
    pub sort_order: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AlbumResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Album> for AlbumResponse {
    fn from(album: Album) -> Self {
        AlbumResponse {
            id: album.id,
            title: album.title,
            slug: album.slug,
            description: album.description,
            created_at: album.created_at,
            updated_at: album.updated_at,
        }
    }
}
