//! # WSI Browser
//!
//! Browse a directory tree of Whole Slide Images (WSI) and stream them as
//! Deep Zoom tiles over HTTP.
//!
//! Many slide formats spread one logical image across several files. This
//! library recognizes those layouts, presents each slide as a single entry
//! while navigating folders, and serves tiles, overviews and pyramid
//! metadata for every slide the decode engine can open.
//!
//! ## Features
//!
//! - **Structural validation**: Single-file, multi-file (VMS/VMU) and
//!   companion-directory (MIRAX) layouts are checked from file layout alone
//! - **Safe browsing**: Every requested path is confined to the slides root
//! - **Bounded handle cache**: Opened slides are reused with FIFO or LRU eviction
//! - **Deep Zoom output**: Fixed 256px JPEG tiles with black edge padding
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`mod@format`] - Format rules, structural checks and the validator
//! - [`slide`] - Decode engine trait, slide index and handle cache
//! - [`tile`] - Tile coordinate mapping, JPEG encoding and the tile service
//! - [`browse`] - Path confinement and directory listings
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wsi_browser::{
//!     create_router, AppState, DirectoryBrowser, FormatValidator, RasterEngine, RouterConfig,
//!     SlideHandleCache, SlideIndex, TileService,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = Arc::new(RasterEngine::new());
//!     let validator = FormatValidator::new(engine.clone());
//!     let index = Arc::new(SlideIndex::new("/data/slides", validator.clone()));
//!     let tiles = Arc::new(TileService::new(index, SlideHandleCache::new(engine)));
//!     let browser = Arc::new(DirectoryBrowser::new("/data/slides", validator));
//!
//!     let router = create_router(AppState::new(tiles, browser), RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod browse;
pub mod config;
pub mod error;
pub mod format;
pub mod server;
pub mod slide;
pub mod tile;

// Re-export commonly used types
pub use browse::{
    confine, BrowseListing, CatalogEntry, DirectoryBrowser, FileEntry, FolderEntry, SlideEntry,
};
pub use config::{Cli, Command, ScanConfig, ServeConfig};
pub use error::{BrowseError, EngineError, PathRejected, TileError};
pub use format::{
    FormatValidator, ScanArena, ScanReport, ScanStatistics, SlideDescriptor, StructureType,
};
pub use server::{create_router, AppState, ErrorResponse, RouterConfig};
pub use slide::{
    slide_id, DecodeEngine, EvictionPolicy, RasterEngine, RasterHandle, SlideHandle,
    SlideHandleCache, SlideIndex,
};
pub use tile::{
    map_tile, JpegTileEncoder, PyramidMetadata, SlideMetadata, TileAddress, TileMapping,
    TileService, DEFAULT_JPEG_QUALITY, DEFAULT_TILE_SIZE,
};
