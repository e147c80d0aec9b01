//! Tile generation facade combining heightfield and biome pipelines.

use veldt_common::coords::TileCoord;
use veldt_common::error::GenResult;

use veldt_worldgen::biome::{Biome, BiomeClassifier, BiomeRegistry};
use veldt_worldgen::climate::ClimateSettings;
use veldt_worldgen::heightfield::{HeightfieldGenerator, HeightfieldSettings, HeightfieldTile};

use crate::config::WorldConfig;

/// Everything the streaming cache stores per tile.
#[derive(Debug, Clone)]
pub struct GeneratedTile {
    /// Height samples with derived normals and slopes.
    pub heightfield: HeightfieldTile,
    /// Majority biome of the tile.
    pub biome: Biome,
}

/// Stateless tile generator, shared across worker threads.
///
/// All fields are immutable after construction, so `&self` generation is
/// safe from any number of threads without locking.
#[derive(Debug)]
pub struct TileGenerator {
    heightfield: HeightfieldGenerator,
    biomes: BiomeClassifier,
    tile_size: f32,
    seed: u64,
}

impl TileGenerator {
    /// Creates a generator from a validated world config.
    #[must_use]
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            heightfield: HeightfieldGenerator::new(config.seed, HeightfieldSettings::default()),
            biomes: BiomeClassifier::new(
                config.seed,
                BiomeRegistry::default(),
                ClimateSettings::default(),
            ),
            tile_size: config.tile_size_meters,
            seed: config.seed,
        }
    }

    /// Creates a generator with explicit pipeline settings.
    #[must_use]
    pub fn with_settings(
        config: &WorldConfig,
        heightfield: HeightfieldSettings,
        registry: BiomeRegistry,
        climate: ClimateSettings,
    ) -> Self {
        Self {
            heightfield: HeightfieldGenerator::new(config.seed, heightfield),
            biomes: BiomeClassifier::new(config.seed, registry, climate),
            tile_size: config.tile_size_meters,
            seed: config.seed,
        }
    }

    /// The world seed this generator derives from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// The biome classifier, for point queries outside tile generation.
    #[must_use]
    pub const fn biomes(&self) -> &BiomeClassifier {
        &self.biomes
    }

    /// Generates a complete tile. Pure in `(seed, coord)`.
    pub fn generate(&self, coord: TileCoord) -> GenResult<GeneratedTile> {
        let heightfield = self.heightfield.generate(coord)?;

        let res = heightfield.resolution;
        let steps = [res / 4, res / 2, 3 * res / 4];
        let mut altitudes = [0.0f32; 9];
        for (j, &sy) in steps.iter().enumerate() {
            for (i, &sx) in steps.iter().enumerate() {
                altitudes[j * 3 + i] = heightfield.height_at(sx, sy);
            }
        }
        let biome = self.biomes.classify_tile(coord, self.tile_size, &altitudes);

        Ok(GeneratedTile { heightfield, biome })
    }
}
