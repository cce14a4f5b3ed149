//! Variant derivation: thumb, large, and original.
//!
//! The thumb is capped on its longer edge and never upscaled. The large
//! variant is capped by total pixel count; sources at or under the cap are
//! re-encoded without resizing so their dimensions survive exactly. The
//! original is passed through untouched.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;

use crate::ProcessingError;

/// Maximum longer-edge size of the thumb variant, in pixels.
pub const THUMB_MAX_EDGE: u32 = 400;

/// JPEG quality of the thumb variant.
pub const THUMB_QUALITY: u8 = 80;

/// JPEG quality of the large variant.
pub const LARGE_QUALITY: u8 = 85;

/// Default total-pixel budget of the large variant, in megapixels.
pub const DEFAULT_LARGE_MAX_MP: u32 = 25;

/// A derived JPEG rendition.
#[derive(Debug, Clone)]
pub struct Variant {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// The untouched source bytes plus what we learned about them.
#[derive(Debug, Clone)]
pub struct OriginalVariant {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
    pub extension: &'static str,
}

/// Output of one variant derivation run.
#[derive(Debug, Clone)]
pub struct VariantSet {
    pub thumb: Variant,
    pub large: Variant,
    pub original: OriginalVariant,
}

/// Longer-edge cap of the large variant for a megapixel budget.
pub fn large_max_dimension(max_mp: u32) -> u32 {
    (max_mp as f64 * 1_000_000.0).sqrt().floor() as u32
}

/// Content type and extension for a detected source format, falling back to
/// JPEG when the format has no mapping.
fn content_type_for(format: ImageFormat) -> (&'static str, &'static str) {
    match format {
        ImageFormat::Jpeg => ("image/jpeg", ".jpg"),
        ImageFormat::Png => ("image/png", ".png"),
        ImageFormat::Gif => ("image/gif", ".gif"),
        ImageFormat::WebP => ("image/webp", ".webp"),
        ImageFormat::Bmp => ("image/bmp", ".bmp"),
        _ => ("image/jpeg", ".jpg"),
    }
}

/// Decode source bytes, also reporting the detected format.
pub(crate) fn decode(input: &[u8]) -> Result<(DynamicImage, ImageFormat), ProcessingError> {
    let reader = ImageReader::new(Cursor::new(input))
        .with_guessed_format()
        .map_err(|e| ProcessingError::Decode(e.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| ProcessingError::Unsupported("unrecognized image data".to_string()))?;
    let img = reader
        .decode()
        .map_err(|e| ProcessingError::Decode(e.to_string()))?;
    Ok((img, format))
}

/// Select a downscale filter based on how aggressive the resize is.
fn select_filter(orig_width: u32, orig_height: u32, new_width: u32, new_height: u32) -> FilterType {
    let width_ratio = orig_width as f32 / new_width as f32;
    let height_ratio = orig_height as f32 / new_height as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        FilterType::Triangle
    } else if max_ratio > 1.5 {
        FilterType::CatmullRom
    } else {
        FilterType::Lanczos3
    }
}

pub(crate) fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ProcessingError> {
    // JPEG has no alpha channel; flatten before encoding.
    let rgb = img.to_rgb8();
    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
        encoder
            .encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;
    }
    Ok(buffer)
}

/// Downscale so both edges fit within `max_edge`, preserving aspect. Never
/// upscales.
fn fit_within(img: &DynamicImage, max_edge: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_edge && height <= max_edge {
        return img.clone();
    }
    let filter = select_filter(width, height, max_edge, max_edge);
    img.resize(max_edge, max_edge, filter)
}

/// Derive the three variants of a source image.
///
/// Fails fast on unsupported or corrupt input; nothing is written anywhere.
pub fn derive_variants(input: &[u8], large_max_mp: u32) -> Result<VariantSet, ProcessingError> {
    let (img, format) = decode(input)?;
    let (width, height) = img.dimensions();
    let (content_type, extension) = content_type_for(format);

    let thumb_img = fit_within(&img, THUMB_MAX_EDGE);
    let (thumb_width, thumb_height) = thumb_img.dimensions();
    let thumb_data = encode_jpeg(&thumb_img, THUMB_QUALITY)?;

    let cap_pixels = large_max_mp as u64 * 1_000_000;
    let large_img = if (width as u64) * (height as u64) <= cap_pixels {
        img.clone()
    } else {
        fit_within(&img, large_max_dimension(large_max_mp))
    };
    let (large_width, large_height) = large_img.dimensions();
    let large_data = encode_jpeg(&large_img, LARGE_QUALITY)?;

    tracing::debug!(
        width,
        height,
        large_width,
        large_height,
        thumb_width,
        thumb_height,
        format = ?format,
        "Derived image variants"
    );

    Ok(VariantSet {
        thumb: Variant {
            data: thumb_data,
            width: thumb_width,
            height: thumb_height,
        },
        large: Variant {
            data: large_data,
            width: large_width,
            height: large_height,
        },
        original: OriginalVariant {
            data: input.to_vec(),
            width,
            height,
            content_type,
            extension,
        },
    })
}
