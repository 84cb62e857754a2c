//! Image encoding and conversion utilities.
//!
//! This module turns decoded camera frames into the JPEG payloads sent to
//! the Gemini API and converts JPEG bytes (captured still, generated product
//! photos) back into egui textures for display.

use crate::error::{AppError, Result};
use eframe::egui;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use std::io::Cursor;

/// JPEG quality used for the captured still (~0.9 in the usual 0-1 scale).
const STILL_JPEG_QUALITY: u8 = 90;

/// Encodes a decoded RGB camera frame as a JPEG still at capture quality.
pub fn encode_still(frame: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer: Vec<u8> = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);

    JpegEncoder::new_with_quality(&mut cursor, STILL_JPEG_QUALITY)
        .encode_image(frame)
        .map_err(|e| AppError::image(format!("Failed to encode still: {}", e)))?;

    Ok(buffer)
}

/// Decodes JPEG bytes into an image, e.g. a generated product photo.
pub fn decode_jpeg(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| AppError::image(format!("Failed to decode image: {}", e)))
}

/// Converts a decoded RGB frame into an egui color image for texture upload.
pub fn frame_to_color_image(frame: &RgbImage) -> egui::ColorImage {
    let size = [frame.width() as usize, frame.height() as usize];
    egui::ColorImage::from_rgb(size, frame.as_raw())
}

/// Decodes JPEG bytes straight to an egui color image.
pub fn jpeg_to_color_image(bytes: &[u8]) -> Result<egui::ColorImage> {
    let decoded = decode_jpeg(bytes)?.to_rgb8();
    Ok(frame_to_color_image(&decoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn test_frame() -> RgbImage {
        RgbImage::from_fn(32, 24, |x, y| {
            Rgb([(x * 8) as u8, (y * 10) as u8, 128])
        })
    }

    #[test]
    fn encodes_frame_as_jpeg() {
        let jpeg = encode_still(&test_frame()).unwrap();
        // JPEG SOI marker
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn encoded_still_decodes_to_source_resolution() {
        let jpeg = encode_still(&test_frame()).unwrap();
        let decoded = decode_jpeg(&jpeg).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 24);
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(matches!(
            decode_jpeg(b"not an image"),
            Err(AppError::ImageProcessing(_))
        ));
    }

    #[test]
    fn frame_converts_to_color_image() {
        let color = frame_to_color_image(&test_frame());
        assert_eq!(color.size, [32, 24]);
    }
}
