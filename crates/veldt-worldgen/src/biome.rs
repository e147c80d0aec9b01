//! Biome definitions and climate-driven classification.
//!
//! Suitability scoring walks the registry in insertion order, so score ties
//! resolve deterministically without any secondary sort.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use veldt_common::coords::TileCoord;

use crate::climate::{ClimateMap, ClimateSample, ClimateSettings};

/// Minimum normalized weight kept in a blend result.
const BLEND_WEIGHT_CUTOFF: f32 = 0.1;

/// Default world-space radius over which neighboring biomes blend.
const DEFAULT_BLEND_RADIUS: f32 = 50.0;

/// Biome identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    /// Temperate grassland.
    Meadows,
    /// Dense temperate forest.
    Forest,
    /// High-altitude rock and snow.
    Mountains,
    /// Open water.
    Ocean,
}

impl Biome {
    /// Human-readable biome name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Meadows => "Meadows",
            Self::Forest => "Forest",
            Self::Mountains => "Mountains",
            Self::Ocean => "Ocean",
        }
    }
}

impl std::fmt::Display for Biome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Acceptance ranges and scoring weight for one biome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiomeDefinition {
    /// Which biome this defines.
    pub biome: Biome,
    /// Representative base elevation for content placement.
    pub base_height: f32,
    /// Typical elevation variation around the base.
    pub height_variation: f32,
    /// Accepted temperature range, degrees Celsius.
    pub temperature: (f32, f32),
    /// Accepted moisture range.
    pub moisture: (f32, f32),
    /// Accepted altitude range, world units.
    pub altitude: (f32, f32),
    /// Scoring weight multiplier.
    pub weight: f32,
}

/// Ordered biome registry. Iteration order is insertion order and is part of
/// the determinism contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiomeRegistry {
    definitions: Vec<BiomeDefinition>,
}

impl BiomeRegistry {
    /// Empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { definitions: Vec::new() }
    }

    /// Appends a definition. Later entries lose score ties to earlier ones.
    pub fn register(&mut self, definition: BiomeDefinition) {
        self.definitions.push(definition);
    }

    /// Definition lookup by biome.
    #[must_use]
    pub fn get(&self, biome: Biome) -> Option<&BiomeDefinition> {
        self.definitions.iter().find(|d| d.biome == biome)
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &BiomeDefinition> {
        self.definitions.iter()
    }

    /// Number of registered biomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for BiomeRegistry {
    /// The stock four-biome table.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(BiomeDefinition {
            biome: Biome::Meadows,
            base_height: 5.0,
            height_variation: 20.0,
            temperature: (5.0, 25.0),
            moisture: (0.3, 0.8),
            altitude: (-5.0, 60.0),
            weight: 1.0,
        });
        registry.register(BiomeDefinition {
            biome: Biome::Forest,
            base_height: 10.0,
            height_variation: 30.0,
            temperature: (0.0, 20.0),
            moisture: (0.65, 1.0),
            altitude: (0.0, 80.0),
            weight: 1.1,
        });
        registry.register(BiomeDefinition {
            biome: Biome::Mountains,
            base_height: 50.0,
            height_variation: 70.0,
            temperature: (-10.0, 15.0),
            moisture: (0.2, 0.9),
            altitude: (30.0, 120.0),
            weight: 0.8,
        });
        registry.register(BiomeDefinition {
            biome: Biome::Ocean,
            base_height: -20.0,
            height_variation: 10.0,
            temperature: (-5.0, 30.0),
            moisture: (0.8, 1.0),
            altitude: (-120.0, 0.0),
            weight: 1.0,
        });
        registry
    }
}

/// Classification result: the winning biome plus the surviving blend weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeResult {
    /// Highest-scoring biome.
    pub primary: Biome,
    /// Normalized weights above the blend cutoff, in registry order. Weights
    /// are normalized before the cutoff is applied and are not renormalized
    /// afterwards, so they may sum to less than one.
    pub weights: Vec<(Biome, f32)>,
    /// World-space radius over which the surviving biomes blend.
    pub blend_radius: f32,
}

/// Climate-driven biome classifier.
#[derive(Debug, Clone)]
pub struct BiomeClassifier {
    registry: BiomeRegistry,
    climate: ClimateMap,
    blend_radius: f32,
}

impl BiomeClassifier {
    /// Creates a classifier over the given registry and climate seed.
    #[must_use]
    pub fn new(seed: u64, registry: BiomeRegistry, climate_settings: ClimateSettings) -> Self {
        Self {
            registry,
            climate: ClimateMap::new(seed, climate_settings),
            blend_radius: DEFAULT_BLEND_RADIUS,
        }
    }

    /// Overrides the blend radius reported in classification results.
    #[must_use]
    pub const fn with_blend_radius(mut self, blend_radius: f32) -> Self {
        self.blend_radius = blend_radius;
        self
    }

    /// The registry backing this classifier.
    #[must_use]
    pub const fn registry(&self) -> &BiomeRegistry {
        &self.registry
    }

    /// The climate map backing this classifier.
    #[must_use]
    pub const fn climate(&self) -> &ClimateMap {
        &self.climate
    }

    /// Classifies a world position at the given altitude.
    #[must_use]
    pub fn classify(&self, pos: Vec2, altitude: f32) -> BiomeResult {
        let sample = self.climate.evaluate(pos, altitude);
        self.classify_climate(&sample)
    }

    /// Classifies directly from a climate sample.
    #[must_use]
    pub fn classify_climate(&self, sample: &ClimateSample) -> BiomeResult {
        debug_assert!(!self.registry.is_empty(), "classifying with empty registry");

        let mut scores: Vec<(Biome, f32)> = Vec::with_capacity(self.registry.len());
        let mut total = 0.0;
        let mut primary = None;
        let mut best = f32::MIN;

        for def in self.registry.iter() {
            let score = suitability(def, sample);
            if score > best {
                best = score;
                primary = Some(def.biome);
            }
            total += score;
            scores.push((def.biome, score));
        }

        let primary = primary.unwrap_or(Biome::Meadows);
        let weights = if total > 0.0 {
            scores
                .into_iter()
                .map(|(b, s)| (b, s / total))
                .filter(|&(_, w)| w > BLEND_WEIGHT_CUTOFF)
                .collect()
        } else {
            // Nothing fits at all; fall back to the primary alone.
            vec![(primary, 1.0)]
        };

        trace!(primary = %primary, candidates = weights.len(), "classified biome");
        BiomeResult {
            primary,
            weights,
            blend_radius: self.blend_radius,
        }
    }

    /// Classifies a whole tile by majority vote over a 3x3 interior grid of
    /// sample points. Ties go to the vote encountered first.
    #[must_use]
    pub fn classify_tile(&self, coord: TileCoord, tile_size: f32, altitudes: &[f32; 9]) -> Biome {
        let corner = coord.corner(tile_size);
        let mut votes: Vec<(Biome, u32)> = Vec::with_capacity(4);

        for (i, &fraction_pair) in grid_fractions().iter().enumerate() {
            let (fx, fy) = fraction_pair;
            let pos = corner + Vec2::new(fx * tile_size, fy * tile_size);
            let result = self.classify(pos, altitudes[i]);
            match votes.iter_mut().find(|(b, _)| *b == result.primary) {
                Some((_, count)) => *count += 1,
                None => votes.push((result.primary, 1)),
            }
        }

        // First-seen entry wins ties because later entries need strictly more.
        let mut winner = votes[0];
        for &v in &votes[1..] {
            if v.1 > winner.1 {
                winner = v;
            }
        }
        winner.0
    }
}

/// Interior sample fractions for tile classification, row-major.
const fn grid_fractions() -> [(f32, f32); 9] {
    [
        (0.25, 0.25),
        (0.5, 0.25),
        (0.75, 0.25),
        (0.25, 0.5),
        (0.5, 0.5),
        (0.75, 0.5),
        (0.25, 0.75),
        (0.5, 0.75),
        (0.75, 0.75),
    ]
}

/// Fit of a value against an acceptance range: 1 inside, decaying linearly to
/// zero over half the range width outside.
fn range_fit(value: f32, range: (f32, f32)) -> f32 {
    let (min, max) = range;
    if value >= min && value <= max {
        return 1.0;
    }
    let half_width = (max - min) * 0.5;
    if half_width <= 0.0 {
        return 0.0;
    }
    let distance = if value < min { min - value } else { value - max };
    (1.0 - distance / half_width).max(0.0)
}

/// Suitability score of one biome for a climate sample.
fn suitability(def: &BiomeDefinition, sample: &ClimateSample) -> f32 {
    let temperature_fit = range_fit(sample.temperature, def.temperature);
    let moisture_fit = range_fit(sample.moisture, def.moisture);
    let altitude_fit = range_fit(sample.altitude, def.altitude);
    let ring_boost = 1.0 + sample.ring_bias * 0.5;
    (temperature_fit * moisture_fit * altitude_fit * ring_boost * def.weight).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(seed: u64) -> BiomeClassifier {
        BiomeClassifier::new(seed, BiomeRegistry::default(), ClimateSettings::default())
    }

    fn sample(temperature: f32, moisture: f32, ring_bias: f32, altitude: f32) -> ClimateSample {
        ClimateSample {
            temperature,
            moisture,
            ring_bias,
            altitude,
        }
    }

    #[test]
    fn test_temperate_midland_is_meadows() {
        let c = classifier(1337);
        let result = c.classify_climate(&sample(15.0, 0.6, 0.0, 0.0));
        assert_eq!(result.primary, Biome::Meadows);
        let meadows_weight = result
            .weights
            .iter()
            .find(|(b, _)| *b == Biome::Meadows)
            .map(|(_, w)| *w)
            .unwrap();
        for &(_, w) in &result.weights {
            assert!(meadows_weight >= w);
        }
    }

    #[test]
    fn test_high_altitude_favors_mountains() {
        let c = classifier(1337);
        let result = c.classify_climate(&sample(0.0, 0.5, 0.0, 90.0));
        assert_eq!(result.primary, Biome::Mountains);
    }

    #[test]
    fn test_wet_lowland_is_ocean() {
        let c = classifier(1337);
        let result = c.classify_climate(&sample(12.0, 0.95, 0.0, -30.0));
        assert_eq!(result.primary, Biome::Ocean);
    }

    #[test]
    fn test_weights_normalized_before_cutoff() {
        let c = classifier(1337);
        let result = c.classify_climate(&sample(15.0, 0.6, 0.0, 0.0));
        let total: f32 = result.weights.iter().map(|(_, w)| w).sum();
        // Dropped entries are not redistributed, so the sum is at most one.
        assert!(total <= 1.0 + 1e-5);
        for &(_, w) in &result.weights {
            assert!(w > BLEND_WEIGHT_CUTOFF);
        }
    }

    #[test]
    fn test_range_fit_decay() {
        assert_eq!(range_fit(10.0, (5.0, 25.0)), 1.0);
        assert_eq!(range_fit(5.0, (5.0, 25.0)), 1.0);
        // Half the range width outside, fit reaches zero.
        assert!(range_fit(-5.0, (5.0, 25.0)).abs() < 1e-6);
        let near = range_fit(4.0, (5.0, 25.0));
        assert!((near - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let a = classifier(777);
        let b = classifier(777);
        for i in 0..32 {
            let pos = Vec2::new(i as f32 * 311.0, i as f32 * -173.0);
            assert_eq!(a.classify(pos, 10.0), b.classify(pos, 10.0));
        }
    }

    #[test]
    fn test_tile_vote_is_deterministic() {
        let c = classifier(2024);
        let altitudes = [4.0, 6.0, 5.0, 7.0, 5.5, 4.5, 6.5, 5.0, 4.0];
        let coord = TileCoord::new(12, -8);
        let first = c.classify_tile(coord, 64.0, &altitudes);
        for _ in 0..5 {
            assert_eq!(c.classify_tile(coord, 64.0, &altitudes), first);
        }
    }

    #[test]
    fn test_ring_bias_boosts_score() {
        let c = classifier(1);
        let flat = c.classify_climate(&sample(15.0, 0.6, 0.0, 0.0));
        let boosted = c.classify_climate(&sample(15.0, 0.6, 1.0, 0.0));
        // The boost multiplies every candidate equally here, so the primary
        // does not change.
        assert_eq!(flat.primary, boosted.primary);
    }
}
