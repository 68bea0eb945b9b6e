//! Tile Service for orchestrating tile generation.
//!
//! The TileService is the main entry point for pixel requests. It orchestrates:
//! - Identifier resolution via the slide index
//! - Slide access via the handle cache
//! - Tile address mapping
//! - Region reads, padding and JPEG encoding
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileService                             │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                      tile()                             │    │
//! │  │  1. Validate quality   4. Map address to region         │    │
//! │  │  2. Resolve id         5. Read region from handle       │    │
//! │  │  3. Acquire handle     6. Pad & encode                  │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌────────────┐    ┌──────────────────┐  ┌──────────────────┐ │
//! │    │ SlideIndex │    │ SlideHandleCache │  │ JpegTileEncoder  │ │
//! │    └────────────┘    └──────────────────┘  └──────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All operations block on file I/O and decoding. Async callers run them on
//! the blocking thread pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::TileError;
use crate::slide::{DecodeEngine, SlideHandle, SlideHandleCache, SlideIndex};

use super::encoder::{compose_tile, is_valid_quality, JpegTileEncoder};
use super::mapper::{map_tile, TileAddress, TileMapping, DEFAULT_TILE_SIZE};

/// Default longest side of an overview image.
pub const DEFAULT_OVERVIEW_MAX_SIZE: u32 = 2000;

// =============================================================================
// Response Types
// =============================================================================

/// Geometry and provenance of an opened slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideMetadata {
    pub slide_id: String,
    pub dimensions: (u32, u32),
    pub level_count: usize,
    pub level_dimensions: Vec<(u32, u32)>,
    pub level_downsamples: Vec<f64>,
    pub vendor: String,
    pub format: String,
}

/// Deep-zoom style description of the tile pyramid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PyramidMetadata {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    pub overlap: u32,
    pub format: &'static str,
    pub levels: usize,
    pub level_dimensions: Vec<(u32, u32)>,
    pub level_downsamples: Vec<f64>,
}

/// Display label from the slide's vendor, falling back to its extension.
pub fn format_label(path: &Path, vendor: &str) -> String {
    let is_tiff = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false);

    if vendor.to_ascii_uppercase().contains("3DHISTECH") {
        "3DHistech MRXS".to_string()
    } else if vendor.contains("Ventana") || vendor.contains("Roche") {
        "Roche/Ventana BIF".to_string()
    } else if is_tiff {
        "Generic TIFF".to_string()
    } else {
        format!("Unknown ({})", vendor)
    }
}

// =============================================================================
// Tile Service
// =============================================================================

/// Service resolving slide identifiers to pixels.
///
/// # Type Parameters
///
/// * `E` - The decode engine shared by the index and the handle cache
pub struct TileService<E: DecodeEngine> {
    index: Arc<SlideIndex<E>>,
    handles: SlideHandleCache<E>,
    encoder: JpegTileEncoder,
    tile_size: u32,
}

impl<E: DecodeEngine> TileService<E> {
    /// Create a service serving 256-pixel tiles.
    pub fn new(index: Arc<SlideIndex<E>>, handles: SlideHandleCache<E>) -> Self {
        Self::with_tile_size(index, handles, DEFAULT_TILE_SIZE)
    }

    /// Create a service with a custom tile edge.
    pub fn with_tile_size(
        index: Arc<SlideIndex<E>>,
        handles: SlideHandleCache<E>,
        tile_size: u32,
    ) -> Self {
        Self {
            index,
            handles,
            encoder: JpegTileEncoder::new(),
            tile_size: tile_size.max(1),
        }
    }

    /// The identifier index.
    pub fn index(&self) -> &Arc<SlideIndex<E>> {
        &self.index
    }

    /// The handle cache.
    pub fn handles(&self) -> &SlideHandleCache<E> {
        &self.handles
    }

    /// Edge of served tiles in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Render one tile as JPEG.
    ///
    /// Returns `Ok(None)` when the address lies beyond the level.
    pub fn tile(
        &self,
        slide_id: &str,
        address: TileAddress,
        quality: u8,
    ) -> Result<Option<Bytes>, TileError> {
        if !is_valid_quality(quality) {
            return Err(TileError::InvalidQuality { quality });
        }

        let (path, handle) = self.open(slide_id)?;
        let mapping = map_tile(
            handle.level_dimensions(),
            handle.level_downsamples(),
            address,
            self.tile_size,
        )?;

        let region = match mapping {
            TileMapping::Region(region) => region,
            TileMapping::OutOfBounds => {
                debug!(slide_id, ?address, "tile out of bounds");
                return Ok(None);
            }
        };

        let pixels = handle
            .read_region(region.level, region.origin, region.size)
            .map_err(|e| {
                error!(slide_id, path = %path.display(), ?address, "region read failed: {}", e);
                TileError::Decode(e)
            })?;

        let tile = compose_tile(&pixels, region.tile_size);
        self.encoder.encode(&tile, quality).map(Some)
    }

    /// Geometry, vendor and format label of a slide.
    pub fn metadata(&self, slide_id: &str) -> Result<SlideMetadata, TileError> {
        let (path, handle) = self.open(slide_id)?;
        let (vendor, format) = vendor_and_format(&path, handle.vendor());

        Ok(SlideMetadata {
            slide_id: slide_id.to_string(),
            dimensions: handle.dimensions(),
            level_count: handle.level_count(),
            level_dimensions: handle.level_dimensions().to_vec(),
            level_downsamples: handle.level_downsamples().to_vec(),
            format,
            vendor,
        })
    }

    /// Tile pyramid description for deep-zoom viewers.
    pub fn pyramid(&self, slide_id: &str) -> Result<PyramidMetadata, TileError> {
        let (_, handle) = self.open(slide_id)?;
        let (width, height) = handle.dimensions();

        Ok(PyramidMetadata {
            width,
            height,
            tile_size: self.tile_size,
            overlap: 0,
            format: "jpeg",
            levels: handle.level_count(),
            level_dimensions: handle.level_dimensions().to_vec(),
            level_downsamples: handle.level_downsamples().to_vec(),
        })
    }

    /// Aspect-preserving overview of the whole slide as JPEG.
    pub fn overview(&self, slide_id: &str, max_size: u32, quality: u8) -> Result<Bytes, TileError> {
        if !is_valid_quality(quality) {
            return Err(TileError::InvalidQuality { quality });
        }

        let (path, handle) = self.open(slide_id)?;
        let thumbnail = handle.thumbnail(max_size.max(1)).map_err(|e| {
            error!(slide_id, path = %path.display(), "thumbnail failed: {}", e);
            TileError::Decode(e)
        })?;
        self.encoder.encode(&thumbnail, quality)
    }

    /// Drop every cached handle.
    pub fn release_all(&self) {
        self.handles.release_all();
    }

    fn open(&self, slide_id: &str) -> Result<(PathBuf, Arc<E::Handle>), TileError> {
        let path = self
            .index
            .resolve(slide_id)
            .ok_or_else(|| TileError::SlideNotFound {
                slide_id: slide_id.to_string(),
            })?;

        let handle = self.handles.acquire(&path).map_err(|e| {
            error!(slide_id, path = %path.display(), "cannot open slide: {}", e);
            TileError::Decode(e)
        })?;
        Ok((path, handle))
    }
}

/// Reported vendor (`"Unknown"` when absent) and the display label. A missing
/// vendor labels as an empty one.
fn vendor_and_format(path: &Path, vendor: Option<String>) -> (String, String) {
    match vendor {
        Some(vendor) => {
            let format = format_label(path, &vendor);
            (vendor, format)
        }
        None => ("Unknown".to_string(), format_label(path, "")),
    }
}

// =============================================================================
// Tests
// =============================================================================
