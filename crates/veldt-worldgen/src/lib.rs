//! Deterministic terrain generation for the Veldt engine.
//!
//! Everything in this crate is a pure function of the world seed and the
//! requested coordinates: noise sampling, heightfield composition, climate
//! evaluation, biome classification, and the checksums that prove it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod biome;
pub mod climate;
pub mod heightfield;
pub mod integrity;
pub mod noise;

/// Common imports for terrain generation.
pub mod prelude {
    pub use crate::biome::{Biome, BiomeClassifier, BiomeDefinition, BiomeRegistry, BiomeResult};
    pub use crate::climate::{ClimateMap, ClimateSample, ClimateSettings};
    pub use crate::heightfield::{
        apply_edit, EditOp, HeightfieldGenerator, HeightfieldSettings, HeightfieldTile,
        MAX_TERRAIN_HEIGHT, SAMPLE_SPACING, TILE_RESOLUTION, TILE_SIZE,
    };
    pub use crate::integrity::{
        compute_checksum, validate_border_seam, validate_checksum, xxhash64, TileChecksum,
        SEAM_TOLERANCE,
    };
    pub use crate::noise::{DomainWarp, NoiseGenerator, NoiseKind, NoiseParameters};
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use veldt_common::coords::TileCoord;
    use veldt_common::version::WORLDGEN_VERSION;

    /// Full-pipeline determinism: repeated generation of the same tile under
    /// the same seed yields identical checksums.
    #[test]
    fn test_pipeline_checksum_stable_over_runs() {
        let seed = 1337;
        let coord = TileCoord::new(0, 0);
        let gen = HeightfieldGenerator::new(seed, HeightfieldSettings::default());

        let reference = compute_checksum(&gen.generate(coord).unwrap(), seed, WORLDGEN_VERSION);
        for _ in 0..5 {
            let fresh = HeightfieldGenerator::new(seed, HeightfieldSettings::default());
            let tile = fresh.generate(coord).unwrap();
            assert_eq!(compute_checksum(&tile, seed, WORLDGEN_VERSION), reference);
        }
    }

    /// Seams hold across a 3x3 block of tiles, including after smoothing.
    #[test]
    fn test_seams_hold_across_tile_block() {
        let gen = HeightfieldGenerator::new(8675309, HeightfieldSettings::default());
        let mut tiles = Vec::new();
        for y in -1..=1 {
            for x in -1..=1 {
                tiles.push(gen.generate(TileCoord::new(x, y)).unwrap());
            }
        }
        for a in &tiles {
            for b in &tiles {
                if a.coord.chebyshev_distance(b.coord) == 1
                    && (a.coord.x == b.coord.x || a.coord.y == b.coord.y)
                {
                    assert!(validate_border_seam(a, b), "{} | {}", a.coord, b.coord);
                }
            }
        }
    }

    /// Tile biome classification is stable when driven from generated data.
    #[test]
    fn test_tile_classification_from_generated_heights() {
        let seed = 1337;
        let gen = HeightfieldGenerator::new(seed, HeightfieldSettings::default());
        let classifier =
            BiomeClassifier::new(seed, BiomeRegistry::default(), ClimateSettings::default());

        let coord = TileCoord::new(2, 3);
        let tile = gen.generate(coord).unwrap();
        let res = tile.resolution;
        let altitudes = {
            let mut a = [0.0f32; 9];
            let steps = [res / 4, res / 2, 3 * res / 4];
            for (j, &sy) in steps.iter().enumerate() {
                for (i, &sx) in steps.iter().enumerate() {
                    a[j * 3 + i] = tile.height_at(sx, sy);
                }
            }
            a
        };

        let first = classifier.classify_tile(coord, TILE_SIZE, &altitudes);
        for _ in 0..3 {
            assert_eq!(classifier.classify_tile(coord, TILE_SIZE, &altitudes), first);
        }
    }
}
