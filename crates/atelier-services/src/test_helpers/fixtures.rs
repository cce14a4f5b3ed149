//! Fixture builders shared by unit and integration tests.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use uuid::Uuid;

use atelier_core::models::Identity;

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([90, 120, 60]));
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), format)
        .expect("fixture image encoding");
    buffer
}

/// A solid-color JPEG of the given dimensions.
pub fn jpeg_image(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

/// A solid-color PNG of the given dimensions.
pub fn png_image(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

/// A throwaway authenticated caller.
pub fn test_identity() -> Identity {
    Identity {
        id: Uuid::new_v4(),
        email: "tester@example.com".to_string(),
    }
}
