//! Tile-grid address to pixel-region mapping.
//!
//! A tile address `(level, column, row)` names a `tile_size × tile_size` block
//! in level space. The decode engine reads regions positioned in level-0
//! coordinates, so the mapper converts the block's top-left corner with the
//! level's downsample factor and clips its size at the level boundary.
//!
//! ```text
//!  level space                       level 0
//!  ┌────┬────┬──┐                    ┌────────┬────────┬────┐
//!  │0,0 │1,0 │2,│  x0 = floor(x·ds)  │        │        │    │
//!  ├────┼────┼──┤ ─────────────────► ├────────┼────────┼────┤
//!  │0,1 │1,1 │2,│                    │        │        │    │
//!  └────┴────┴──┘                    └────────┴────────┴────┘
//!           edge tiles are smaller and padded to a full tile
//! ```
//!
//! Pure arithmetic; no I/O.

use crate::error::TileError;

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Position of a tile in a level's grid. Level 0 is full resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    pub level: usize,
    pub col: u32,
    pub row: u32,
}

impl TileAddress {
    pub const fn new(level: usize, col: u32, row: u32) -> Self {
        Self { level, col, row }
    }
}

/// Region the decode engine must read for one tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRegion {
    /// Pyramid level to read from
    pub level: usize,

    /// Top-left corner in level-0 pixels
    pub origin: (u64, u64),

    /// Width and height in level pixels, never larger than `tile_size`
    pub size: (u32, u32),

    /// Edge of the full output tile
    pub tile_size: u32,
}

impl TileRegion {
    /// Whether the region is smaller than a full tile.
    pub fn needs_padding(&self) -> bool {
        self.size.0 < self.tile_size || self.size.1 < self.tile_size
    }
}

/// Result of mapping a tile address.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TileMapping {
    /// The tile overlaps the level
    Region(TileRegion),

    /// The tile starts beyond the level's right or bottom edge
    OutOfBounds,
}

/// Map a tile address onto the pyramid.
///
/// `level_dims` and `downsamples` are indexed by level. A level without a
/// matching downsample is treated as missing.
pub fn map_tile(
    level_dims: &[(u32, u32)],
    downsamples: &[f64],
    address: TileAddress,
    tile_size: u32,
) -> Result<TileMapping, TileError> {
    let max_levels = level_dims.len().min(downsamples.len());
    if address.level >= max_levels {
        return Err(TileError::InvalidLevel {
            level: address.level,
            max_levels,
        });
    }

    let (level_width, level_height) = level_dims[address.level];
    let downsample = downsamples[address.level];

    let x = address.col as u64 * tile_size as u64;
    let y = address.row as u64 * tile_size as u64;
    if x >= level_width as u64 || y >= level_height as u64 {
        return Ok(TileMapping::OutOfBounds);
    }

    let origin = (
        (x as f64 * downsample).floor() as u64,
        (y as f64 * downsample).floor() as u64,
    );

    // Both differences are positive and below u32::MAX here
    let width = (tile_size as u64).min(level_width as u64 - x) as u32;
    let height = (tile_size as u64).min(level_height as u64 - y) as u32;

    Ok(TileMapping::Region(TileRegion {
        level: address.level,
        origin,
        size: (width, height),
        tile_size,
    }))
}

/// Number of tile columns and rows needed to cover a level.
pub fn tile_grid(level_dims: (u32, u32), tile_size: u32) -> (u32, u32) {
    let tile_size = tile_size.max(1);
    (
        level_dims.0.div_ceil(tile_size),
        level_dims.1.div_ceil(tile_size),
    )
}
