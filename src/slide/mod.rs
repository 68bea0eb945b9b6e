//! Slide access layer.
//!
//! Everything between a slide identifier and an opened handle:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! └──────────┬──────────────────┬───────────┘
//!            │ id               │ path
//!            ▼                  ▼
//! ┌────────────────────┐ ┌──────────────────────┐
//! │    SlideIndex      │ │   SlideHandleCache   │
//! │ (id → entry point) │ │ (path → open handle) │
//! └──────────┬─────────┘ └──────────┬───────────┘
//!            │ scan                 │ open
//!            ▼                      ▼
//! ┌─────────────────────────────────────────┐
//! │         DecodeEngine Trait              │
//! │  (detect, open, read regions)           │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//!            ┌───────────────────┐
//!            │   RasterEngine    │
//!            │ (image crate)     │
//!            └───────────────────┘
//! ```

mod cache;
mod engine;
mod index;
mod raster;

pub use cache::{EvictionPolicy, SlideHandleCache, DEFAULT_HANDLE_CACHE_CAPACITY};
pub use engine::{DecodeEngine, SlideHandle};
pub use index::{slide_id, SlideIndex, SLIDE_ID_LEN};
pub use raster::{RasterEngine, RasterHandle};
