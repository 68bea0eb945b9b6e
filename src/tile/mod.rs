//! Tile service layer.
//!
//! This module turns tile addresses into JPEG bytes for HTTP handlers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │ spawn_blocking
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  Coordinate  │  │  JPEG Encoder   │  │
//! │  │  Mapper      │  │  (pad →         │  │
//! │  │              │  │   encode)       │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │      SlideIndex + SlideHandleCache      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileService`]: Main entry point for tile, metadata and overview requests
//! - [`map_tile`]: Pure tile-address to pixel-region arithmetic
//! - [`JpegTileEncoder`]: Encodes padded RGB tiles at the requested quality

mod encoder;
mod mapper;
mod service;

pub use encoder::{
    clamp_quality, compose_tile, is_valid_quality, JpegTileEncoder, DEFAULT_JPEG_QUALITY,
    MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use mapper::{map_tile, tile_grid, TileAddress, TileMapping, TileRegion, DEFAULT_TILE_SIZE};
pub use service::{
    format_label, PyramidMetadata, SlideMetadata, TileService, DEFAULT_OVERVIEW_MAX_SIZE,
};
