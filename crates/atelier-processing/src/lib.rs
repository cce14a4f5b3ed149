//! Atelier Processing Library
//!
//! Pure image processing: variant derivation (thumb, large, original) and
//! source transforms (rotate, crop). No side effects live here so every
//! operation can be retried freely.

pub mod transform;
pub mod variants;

use thiserror::Error;

/// Image processing errors
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Unsupported image format: {0}")]
    Unsupported(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Rotation must be 90, 180, or 270 degrees (got {0})")]
    InvalidRotation(u16),

    #[error("Crop rectangle {width}x{height}+{x}+{y} exceeds image bounds {image_width}x{image_height}")]
    InvalidCrop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
}

pub use transform::{crop, rotate, CropRect};
pub use variants::{
    derive_variants, large_max_dimension, OriginalVariant, Variant, VariantSet,
    DEFAULT_LARGE_MAX_MP, LARGE_QUALITY, THUMB_MAX_EDGE, THUMB_QUALITY,
};
