//! Decode engine boundary.
//!
//! The decode engine is the only component that understands slide pixel data.
//! Everything else in the crate works from file layout and from the geometry
//! the engine reports through [`SlideHandle`].
//!
//! # Contract
//!
//! - [`DecodeEngine::detect_format`] is the authoritative capability check. It
//!   returns `Ok(None)` when the file is not recognized and `Err` only when the
//!   probe itself faults.
//! - [`DecodeEngine::open`] fails when the file cannot be parsed.
//! - Handles are closed by dropping them. The handle cache owns one reference
//!   while the handle is resident and in-flight requests may hold others.

use std::path::Path;

use image::{RgbImage, RgbaImage};

use crate::error::EngineError;

/// An opened slide.
pub trait SlideHandle: Send + Sync + 'static {
    /// Dimensions of the full-resolution (level 0) image.
    fn dimensions(&self) -> (u32, u32);

    /// Number of pyramid levels.
    fn level_count(&self) -> usize {
        self.level_dimensions().len()
    }

    /// Dimensions of every level, level 0 first.
    fn level_dimensions(&self) -> &[(u32, u32)];

    /// Downsample factor of every level relative to level 0.
    fn level_downsamples(&self) -> &[f64];

    /// Vendor reported by the slide's embedded metadata.
    fn vendor(&self) -> Option<String>;

    /// Read a region of `size` pixels at `level`, positioned by its level-0
    /// `origin`. Pixels outside the image are transparent.
    fn read_region(
        &self,
        level: usize,
        origin: (u64, u64),
        size: (u32, u32),
    ) -> Result<RgbaImage, EngineError>;

    /// Aspect-preserving RGB thumbnail whose longest side is at most `max_size`.
    fn thumbnail(&self, max_size: u32) -> Result<RgbImage, EngineError>;
}

/// Detects and opens slides.
pub trait DecodeEngine: Send + Sync + 'static {
    /// The handle type produced by [`DecodeEngine::open`].
    type Handle: SlideHandle;

    /// Return the canonical format tag (e.g. `"mirax"`, `"aperio"`) if this
    /// engine can open the file.
    fn detect_format(&self, path: &Path) -> Result<Option<String>, EngineError>;

    /// Open a validated entry point.
    fn open(&self, path: &Path) -> Result<Self::Handle, EngineError>;
}
