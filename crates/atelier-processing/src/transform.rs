//! Source transforms applied before re-deriving variants.
//!
//! Transforms produce new source bytes in the detected input format; the
//! caller feeds the result back through variant derivation.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

use crate::variants::decode;
use crate::ProcessingError;

/// Crop rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

fn encode_as(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ProcessingError> {
    // GIF and WebP encoders reject some color layouts the decoder can
    // produce; normalize to RGBA first.
    let normalized = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => DynamicImage::ImageRgba8(img.to_rgba8()),
    };
    let mut buffer = Vec::new();
    normalized
        .write_to(&mut Cursor::new(&mut buffer), format)
        .map_err(|e| ProcessingError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Rotate source bytes by 90, 180, or 270 degrees clockwise.
pub fn rotate(input: &[u8], degrees: u16) -> Result<Vec<u8>, ProcessingError> {
    let (img, format) = decode(input)?;
    let rotated = match degrees {
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        other => return Err(ProcessingError::InvalidRotation(other)),
    };
    encode_as(&rotated, format)
}

/// Crop source bytes to a rectangle that must lie within the image bounds.
pub fn crop(input: &[u8], rect: CropRect) -> Result<Vec<u8>, ProcessingError> {
    let (img, format) = decode(input)?;
    let (width, height) = img.dimensions();

    let in_bounds = rect.width > 0
        && rect.height > 0
        && rect.x.checked_add(rect.width).is_some_and(|right| right <= width)
        && rect.y.checked_add(rect.height).is_some_and(|bottom| bottom <= height);
    if !in_bounds {
        return Err(ProcessingError::InvalidCrop {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            image_width: width,
            image_height: height,
        });
    }

    let cropped = img.crop_imm(rect.x, rect.y, rect.width, rect.height);
    encode_as(&cropped, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([20, 120, 220]));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), format)
            .unwrap();
        buffer
    }

    fn dimensions_of(data: &[u8]) -> (u32, u32) {
        let (img, _) = decode(data).unwrap();
        img.dimensions()
    }

    #[test]
    fn test_rotate_90_swaps_dimensions() {
        let input = test_image(200, 100, ImageFormat::Jpeg);
        let rotated = rotate(&input, 90).unwrap();
        assert_eq!(dimensions_of(&rotated), (100, 200));
    }

    #[test]
    fn test_rotate_180_keeps_dimensions() {
        let input = test_image(200, 100, ImageFormat::Png);
        let rotated = rotate(&input, 180).unwrap();
        assert_eq!(dimensions_of(&rotated), (200, 100));
    }

    #[test]
    fn test_rotate_preserves_source_format() {
        let input = test_image(60, 40, ImageFormat::Png);
        let rotated = rotate(&input, 270).unwrap();
        let (_, format) = decode(&rotated).unwrap();
        assert_eq!(format, ImageFormat::Png);
    }

    #[test]
    fn test_rotate_rejects_other_angles() {
        let input = test_image(10, 10, ImageFormat::Jpeg);
        for degrees in [0, 45, 360] {
            let err = rotate(&input, degrees).unwrap_err();
            assert!(matches!(err, ProcessingError::InvalidRotation(_)));
        }
    }

    #[test]
    fn test_crop_within_bounds() {
        let input = test_image(100, 80, ImageFormat::Jpeg);
        let cropped = crop(
            &input,
            CropRect {
                x: 10,
                y: 20,
                width: 50,
                height: 40,
            },
        )
        .unwrap();
        assert_eq!(dimensions_of(&cropped), (50, 40));
    }

    #[test]
    fn test_crop_out_of_bounds_rejected() {
        let input = test_image(100, 80, ImageFormat::Jpeg);
        let err = crop(
            &input,
            CropRect {
                x: 60,
                y: 0,
                width: 50,
                height: 40,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidCrop { .. }));

        let err = crop(
            &input,
            CropRect {
                x: 0,
                y: 0,
                width: 0,
                height: 10,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidCrop { .. }));
    }
}
