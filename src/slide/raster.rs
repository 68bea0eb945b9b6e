//! Reference decode engine backed by the `image` crate.
//!
//! The engine recognizes TIFF and BigTIFF files, tags them by the vendor
//! markers found in their first kilobyte, and opens them by decoding the whole
//! raster. A pyramid is synthesized by repeated halving, so every level is held
//! in memory; this suits moderate rasters and test fixtures rather than
//! gigapixel scans.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, RgbImage, RgbaImage};
use tracing::debug;

use super::engine::{DecodeEngine, SlideHandle};
use crate::error::EngineError;
use crate::format::signature::read_head;

/// Bytes inspected by [`RasterEngine::detect_format`].
const DETECT_PROBE_BYTES: usize = 1024;

/// Halving stops once both dimensions fit in this size.
const PYRAMID_MIN_SIZE: u32 = 256;

const TIFF_MAGICS: [&[u8]; 4] = [b"II*\0", b"MM\0*", b"II+\0", b"MM\0+"];

/// Vendor markers checked in order once Aperio and NDPI are ruled out.
const VENDOR_MARKERS: [(&str, &str); 4] = [
    ("Leica", "leica"),
    ("iScan", "ventana"),
    ("Ventana", "ventana"),
    ("Philips", "philips"),
];

/// Decode engine for TIFF-based rasters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterEngine;

impl RasterEngine {
    pub fn new() -> Self {
        Self
    }
}

fn tag_for(path: &Path, head: &[u8]) -> Option<String> {
    if !TIFF_MAGICS.iter().any(|magic| head.starts_with(magic)) {
        return None;
    }

    let text = String::from_utf8_lossy(head);
    if text.contains("Aperio") {
        return Some("aperio".to_string());
    }
    let is_ndpi = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("ndpi"))
        .unwrap_or(false);
    if is_ndpi {
        return Some("hamamatsu".to_string());
    }
    let tag = VENDOR_MARKERS
        .iter()
        .find(|(marker, _)| text.contains(*marker))
        .map(|(_, tag)| *tag)
        .unwrap_or("generic-tiff");
    Some(tag.to_string())
}

impl DecodeEngine for RasterEngine {
    type Handle = RasterHandle;

    fn detect_format(&self, path: &Path) -> Result<Option<String>, EngineError> {
        let head = read_head(path, DETECT_PROBE_BYTES)
            .map_err(|e| EngineError::Fault(format!("{}: {}", path.display(), e)))?;
        Ok(tag_for(path, &head))
    }

    fn open(&self, path: &Path) -> Result<RasterHandle, EngineError> {
        if !path.is_file() {
            return Err(EngineError::NotFound(path.to_path_buf()));
        }

        let open_error = |message: String| EngineError::Open {
            path: path.to_path_buf(),
            message,
        };

        let vendor = self.detect_format(path)?;
        let image = ImageReader::open(path)
            .map_err(|e| open_error(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| open_error(e.to_string()))?
            .decode()
            .map_err(|e| open_error(e.to_string()))?;

        let handle = RasterHandle::from_image(image, vendor);
        debug!(
            path = %path.display(),
            levels = handle.level_count(),
            "Decoded raster"
        );
        Ok(handle)
    }
}

/// An opened raster with its synthesized pyramid.
pub struct RasterHandle {
    levels: Vec<RgbaImage>,
    dimensions: Vec<(u32, u32)>,
    downsamples: Vec<f64>,
    vendor: Option<String>,
}

impl RasterHandle {
    /// Build the pyramid for an already decoded image.
    pub fn from_image(image: DynamicImage, vendor: Option<String>) -> Self {
        let base = image.to_rgba8();
        let (width, height) = base.dimensions();

        let mut levels = vec![base];
        loop {
            let (w, h) = levels[levels.len() - 1].dimensions();
            if w <= PYRAMID_MIN_SIZE && h <= PYRAMID_MIN_SIZE {
                break;
            }
            let next = imageops::resize(
                &levels[levels.len() - 1],
                w.div_ceil(2),
                h.div_ceil(2),
                FilterType::Triangle,
            );
            levels.push(next);
        }

        let dimensions: Vec<(u32, u32)> = levels.iter().map(|level| level.dimensions()).collect();
        let downsamples = dimensions
            .iter()
            .map(|&(w, h)| (width as f64 / w as f64 + height as f64 / h as f64) / 2.0)
            .collect();

        Self {
            levels,
            dimensions,
            downsamples,
            vendor,
        }
    }

    fn level(&self, level: usize) -> Result<&RgbaImage, EngineError> {
        self.levels.get(level).ok_or_else(|| EngineError::Read {
            level,
            message: format!("slide has {} levels", self.levels.len()),
        })
    }
}

impl SlideHandle for RasterHandle {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions[0]
    }

    fn level_dimensions(&self) -> &[(u32, u32)] {
        &self.dimensions
    }

    fn level_downsamples(&self) -> &[f64] {
        &self.downsamples
    }

    fn vendor(&self) -> Option<String> {
        self.vendor.clone()
    }

    fn read_region(
        &self,
        level: usize,
        origin: (u64, u64),
        size: (u32, u32),
    ) -> Result<RgbaImage, EngineError> {
        let source = self.level(level)?;
        let downsample = self.downsamples[level];

        let x = to_level(origin.0, downsample);
        let y = to_level(origin.1, downsample);

        let mut region = RgbaImage::new(size.0, size.1);
        imageops::replace(&mut region, source, -x, -y);
        Ok(region)
    }

    fn thumbnail(&self, max_size: u32) -> Result<RgbImage, EngineError> {
        let (width, height) = self.dimensions();
        let (tw, th) = thumbnail_size(width, height, max_size);

        // Smallest level still at least as large as the thumbnail
        let source = self
            .levels
            .iter()
            .rev()
            .find(|level| level.width() >= tw && level.height() >= th)
            .unwrap_or(&self.levels[0]);

        let thumb = imageops::thumbnail(source, tw, th);
        Ok(DynamicImage::ImageRgba8(thumb).to_rgb8())
    }
}

/// Level-space coordinate of a level-0 coordinate produced as
/// `floor(level_x * downsample)`. With `downsample >= 1` the quotient lies in
/// `(level_x - 1, level_x]`, so the ceiling recovers `level_x`.
fn to_level(level0: u64, downsample: f64) -> i64 {
    (level0 as f64 / downsample - 1e-6).ceil().max(0.0) as i64
}

/// Aspect-preserving size whose longest side is at most `max_size`.
fn thumbnail_size(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    let longest = width.max(height).max(1);
    if longest <= max_size {
        return (width.max(1), height.max(1));
    }
    let scale = max_size as f64 / longest as f64;
    let tw = ((width as f64 * scale).round() as u32).clamp(1, max_size);
    let th = ((height as f64 * scale).round() as u32).clamp(1, max_size);
    (tw, th)
}
