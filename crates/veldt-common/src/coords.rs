//! Tile coordinates and world-space conversions.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Coordinate of a terrain tile in the world grid.
///
/// A tile coordinate maps bijectively to an axis-aligned world-space square
/// of `tile_size` length units; [`TileCoord::from_world`] and
/// [`TileCoord::corner`] are inverses up to floor rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// X coordinate in tile space
    pub x: i32,
    /// Y coordinate in tile space
    pub y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Buckets a world-space position into its owning tile.
    #[must_use]
    pub fn from_world(pos: Vec2, tile_size: f32) -> Self {
        Self {
            x: (pos.x / tile_size).floor() as i32,
            y: (pos.y / tile_size).floor() as i32,
        }
    }

    /// World-space position of the tile's minimum corner.
    #[must_use]
    pub fn corner(self, tile_size: f32) -> Vec2 {
        Vec2::new(self.x as f32 * tile_size, self.y as f32 * tile_size)
    }

    /// World-space position of the tile's center.
    #[must_use]
    pub fn center(self, tile_size: f32) -> Vec2 {
        Vec2::new(
            (self.x as f32 + 0.5) * tile_size,
            (self.y as f32 + 0.5) * tile_size,
        )
    }

    /// Chebyshev ("max") distance to another tile. Streaming rings are
    /// square, so this is the ring metric.
    #[must_use]
    pub const fn chebyshev_distance(self, other: Self) -> i32 {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        if dx > dy {
            dx
        } else {
            dy
        }
    }

    /// Whether this tile lies within `radius` tiles of `center` (square ring).
    #[must_use]
    pub const fn within(self, center: Self, radius: i32) -> bool {
        self.chebyshev_distance(center) <= radius
    }

    /// Offset of `other` relative to this tile.
    #[must_use]
    pub const fn offset_to(self, other: Self) -> (i32, i32) {
        (other.x - self.x, other.y - self.y)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Iterator over all tiles within a square ring of `radius` around `center`,
/// row-major.
pub fn tiles_in_radius(center: TileCoord, radius: i32) -> impl Iterator<Item = TileCoord> {
    let (cx, cy) = (center.x, center.y);
    (cy - radius..=cy + radius)
        .flat_map(move |y| (cx - radius..=cx + radius).map(move |x| TileCoord::new(x, y)))
}
