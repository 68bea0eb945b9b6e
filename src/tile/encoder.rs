//! JPEG tile encoder.
//!
//! Regions come back from the decode engine as RGBA. Output tiles are always
//! RGB JPEG: alpha is dropped and regions smaller than a tile are placed at the
//! top-left of a black canvas.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, RgbImage, RgbaImage};

use crate::error::TileError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// JPEG Encoder
// =============================================================================

/// Encodes RGB rasters as JPEG.
#[derive(Debug, Clone, Default)]
pub struct JpegTileEncoder {}

impl JpegTileEncoder {
    /// Create a new JPEG tile encoder.
    pub fn new() -> Self {
        Self {}
    }

    /// Encode `image` at `quality`, clamped to 1-100.
    pub fn encode(&self, image: &RgbImage, quality: u8) -> Result<Bytes, TileError> {
        let quality = clamp_quality(quality);

        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);
        encoder
            .encode_image(image)
            .map_err(|e| TileError::Encode {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }

    /// Encode at the default quality.
    pub fn encode_default(&self, image: &RgbImage) -> Result<Bytes, TileError> {
        self.encode(image, DEFAULT_JPEG_QUALITY)
    }
}

/// Convert a region to RGB and pad it to `tile_size × tile_size` when smaller.
///
/// Regions already at least a full tile in both directions are returned as-is.
pub fn compose_tile(region: &RgbaImage, tile_size: u32) -> RgbImage {
    let rgb = DynamicImage::ImageRgba8(region.clone()).to_rgb8();
    if rgb.width() >= tile_size && rgb.height() >= tile_size {
        return rgb;
    }

    let mut canvas = RgbImage::new(tile_size, tile_size);
    imageops::replace(&mut canvas, &rgb, 0, 0);
    canvas
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate JPEG quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
