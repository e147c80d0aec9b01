//! # Veldt Common
//!
//! Foundational types shared across the Veldt terrain engine:
//! - Tile coordinates and world-space conversions
//! - Edit ID type for terrain-delta records
//! - Schema versions and file magic for persisted data
//! - Common error types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_tile_coord_roundtrip() {
        let coord = TileCoord::new(3, -2);
        let corner = coord.corner(64.0);
        assert_eq!(TileCoord::from_world(corner, 64.0), coord);

        // Anywhere inside the square buckets back to the same tile.
        let inside = corner + Vec2::new(63.9, 0.1);
        assert_eq!(TileCoord::from_world(inside, 64.0), coord);
    }

    #[test]
    fn test_edit_id_uniqueness() {
        let a = EditId::new();
        let b = EditId::new();
        assert_ne!(a, b);
        assert!(a.is_valid());
    }

    #[test]
    fn test_magic_bytes_are_ascii() {
        assert!(MagicBytes::TERRAIN_DELTA.0.iter().all(u8::is_ascii_uppercase));
    }
}
