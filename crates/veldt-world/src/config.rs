//! World configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

use veldt_worldgen::heightfield::{MAX_TERRAIN_HEIGHT, SAMPLE_SPACING, TILE_SIZE};

/// Streaming and generation configuration for one world.
///
/// Radii are Chebyshev distances in tiles; the three streaming rings must
/// nest (`active <= load <= generate`). [`WorldConfig::validated`] corrects
/// violations instead of failing, so a bad config file degrades gracefully.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// World seed. Everything deterministic derives from this.
    pub seed: u64,
    /// Tile edge length in world units.
    pub tile_size_meters: f32,
    /// Heightfield sample spacing in world units.
    pub sample_spacing_meters: f32,
    /// Absolute height clamp.
    pub max_terrain_height: f32,
    /// Sea level, world units.
    pub sea_level: f32,
    /// Tiles within this ring are generated.
    pub generate_radius: i32,
    /// Tiles within this ring are kept loaded.
    pub load_radius: i32,
    /// Tiles within this ring are active for simulation.
    pub active_radius: i32,
    /// Cache capacity in tiles before LRU eviction kicks in.
    pub max_cache_size: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 1337,
            tile_size_meters: TILE_SIZE,
            sample_spacing_meters: SAMPLE_SPACING,
            max_terrain_height: MAX_TERRAIN_HEIGHT,
            sea_level: 0.0,
            generate_radius: 9,
            load_radius: 5,
            active_radius: 3,
            max_cache_size: 81,
        }
    }
}

impl WorldConfig {
    /// Returns a corrected copy of this config, warning on every adjustment.
    #[must_use]
    pub fn validated(mut self) -> Self {
        if self.generate_radius < 0 {
            warn!(value = self.generate_radius, "negative generate_radius, clamping to 0");
            self.generate_radius = 0;
        }
        if self.load_radius < 0 {
            warn!(value = self.load_radius, "negative load_radius, clamping to 0");
            self.load_radius = 0;
        }
        if self.active_radius < 0 {
            warn!(value = self.active_radius, "negative active_radius, clamping to 0");
            self.active_radius = 0;
        }
        if self.load_radius > self.generate_radius {
            warn!(
                load = self.load_radius,
                generate = self.generate_radius,
                "load_radius exceeds generate_radius, clamping"
            );
            self.load_radius = self.generate_radius;
        }
        if self.active_radius > self.load_radius {
            warn!(
                active = self.active_radius,
                load = self.load_radius,
                "active_radius exceeds load_radius, clamping"
            );
            self.active_radius = self.load_radius;
        }
        if self.max_cache_size == 0 {
            let fallback = ((2 * self.generate_radius + 1) * (2 * self.generate_radius + 1)) as usize;
            warn!(fallback, "max_cache_size of 0, using generate-ring area");
            self.max_cache_size = fallback.max(1);
        }
        if self.tile_size_meters <= 0.0 {
            warn!(value = self.tile_size_meters, "non-positive tile size, using default");
            self.tile_size_meters = TILE_SIZE;
        }
        self
    }
}
