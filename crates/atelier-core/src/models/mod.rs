pub mod album;
pub mod asset;
pub mod identity;
pub mod post;

pub use album::{Album, AlbumAssetRow, AlbumResponse};
pub use asset::{Asset, AssetDetails, AssetResponse};
pub use identity::Identity;
pub use post::{Post, PostResponse, PostStatus};
