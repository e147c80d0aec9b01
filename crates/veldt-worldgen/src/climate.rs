//! Climate evaluation: temperature, moisture, and the radial ring bias.
//!
//! Climate is a pure function of world position and altitude, so biome
//! classification downstream inherits determinism for free.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::heightfield::HeightfieldTile;
use crate::noise::NoiseGenerator;

/// White-noise channel for temperature perturbation.
const CHANNEL_TEMPERATURE: u32 = 0;
/// White-noise channel for moisture perturbation.
const CHANNEL_MOISTURE: u32 = 1;

/// Climate model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateSettings {
    /// Temperature at the equator at sea level, degrees Celsius.
    pub base_temperature: f32,
    /// Maximum temperature drop from equator to the latitudinal extreme.
    pub latitudinal_range: f32,
    /// World-space Y of the equator.
    pub equator_y: f32,
    /// Degrees lost per 1000 units of altitude.
    pub altitude_lapse_rate: f32,
    /// Scale applied to position before temperature noise lookup.
    pub temperature_noise_scale: f32,
    /// Amplitude of temperature noise in degrees.
    pub temperature_noise_amplitude: f32,

    /// Baseline moisture in `[0, 1]`.
    pub base_moisture: f32,
    /// Spacing of the synthetic coastline grid, world units.
    pub coast_spacing: f32,
    /// Distance over which coastal moisture influence decays to zero.
    pub coast_influence_distance: f32,
    /// Scale applied to position before moisture noise lookup.
    pub moisture_noise_scale: f32,
    /// Amplitude of moisture noise.
    pub moisture_noise_amplitude: f32,

    /// Center of the radial ring bias.
    pub world_center: Vec2,
    /// Radius inside which the ring bias is nonzero.
    pub ring_radius: f32,
    /// Falloff exponent shaping the ring bias curve.
    pub ring_falloff_exponent: f32,
    /// Peak ring bias at the world center.
    pub ring_strength: f32,
}

impl Default for ClimateSettings {
    fn default() -> Self {
        Self {
            base_temperature: 15.0,
            latitudinal_range: 20.0,
            equator_y: 0.0,
            altitude_lapse_rate: 6.5,
            temperature_noise_scale: 0.001,
            temperature_noise_amplitude: 3.0,
            base_moisture: 0.5,
            coast_spacing: 3000.0,
            coast_influence_distance: 1500.0,
            moisture_noise_scale: 0.002,
            moisture_noise_amplitude: 0.15,
            world_center: Vec2::ZERO,
            ring_radius: 5000.0,
            ring_falloff_exponent: 2.0,
            ring_strength: 1.0,
        }
    }
}

/// Climate at a single point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateSample {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Normalized moisture in `[0, 1]`.
    pub moisture: f32,
    /// Radial ring bias in `[0, 1]`, peaking at the world center.
    pub ring_bias: f32,
    /// Altitude the sample was evaluated at.
    pub altitude: f32,
}

/// Deterministic climate evaluator.
#[derive(Debug, Clone)]
pub struct ClimateMap {
    settings: ClimateSettings,
    noise: NoiseGenerator,
}

impl ClimateMap {
    /// Creates a climate map for the given seed.
    #[must_use]
    pub fn new(seed: u64, settings: ClimateSettings) -> Self {
        Self {
            settings,
            noise: NoiseGenerator::new(seed),
        }
    }

    /// The settings this map evaluates against.
    #[must_use]
    pub const fn settings(&self) -> &ClimateSettings {
        &self.settings
    }

    /// Evaluates the full climate sample at a position and altitude.
    #[must_use]
    pub fn evaluate(&self, pos: Vec2, altitude: f32) -> ClimateSample {
        ClimateSample {
            temperature: self.temperature(pos, altitude),
            moisture: self.moisture(pos),
            ring_bias: self.ring_bias(pos),
            altitude,
        }
    }

    /// Evaluates climate for every sample of a tile, row-major, using the
    /// tile's heights as altitudes.
    #[must_use]
    pub fn tile_climate(&self, tile: &HeightfieldTile) -> Vec<ClimateSample> {
        let res = tile.resolution;
        let mut out = Vec::with_capacity((res * res) as usize);
        for y in 0..res {
            for x in 0..res {
                let pos = tile.sample_position(x, y);
                out.push(self.evaluate(pos, tile.height_at(x, y)));
            }
        }
        out
    }

    /// Temperature: latitudinal gradient plus altitude lapse plus noise.
    #[must_use]
    pub fn temperature(&self, pos: Vec2, altitude: f32) -> f32 {
        let s = &self.settings;
        let latitude = (pos.y - s.equator_y).abs() / 10_000.0;
        let latitudinal = -latitude * s.latitudinal_range;
        let lapse = altitude / 1000.0 * s.altitude_lapse_rate;
        let jitter = self
            .noise
            .white(pos * s.temperature_noise_scale, CHANNEL_TEMPERATURE)
            * s.temperature_noise_amplitude;
        s.base_temperature + latitudinal - lapse + jitter
    }

    /// Moisture: baseline plus coastal influence plus noise, clamped.
    #[must_use]
    pub fn moisture(&self, pos: Vec2) -> f32 {
        let s = &self.settings;
        let coastal = self.coast_influence(pos) * 0.3;
        let jitter = self
            .noise
            .white(pos * s.moisture_noise_scale, CHANNEL_MOISTURE)
            * s.moisture_noise_amplitude;
        (s.base_moisture + coastal + jitter).clamp(0.0, 1.0)
    }

    /// Influence of the nearest synthetic coastline in `[0, 1]`. Coastlines
    /// form a grid every `coast_spacing` units on both axes.
    fn coast_influence(&self, pos: Vec2) -> f32 {
        let s = &self.settings;
        if s.coast_spacing <= 0.0 || s.coast_influence_distance <= 0.0 {
            return 0.0;
        }
        let dist_axis = |v: f32| {
            let m = v.rem_euclid(s.coast_spacing);
            m.min(s.coast_spacing - m)
        };
        let dist = dist_axis(pos.x).min(dist_axis(pos.y));
        (1.0 - dist / s.coast_influence_distance).clamp(0.0, 1.0)
    }

    /// Radial bias in `[0, 1]` peaking at the world center, zero at and
    /// beyond the ring radius.
    #[must_use]
    pub fn ring_bias(&self, pos: Vec2) -> f32 {
        let s = &self.settings;
        if s.ring_radius <= 0.0 {
            return 0.0;
        }
        let dist = pos.distance(s.world_center);
        if dist >= s.ring_radius {
            return 0.0;
        }
        (1.0 - dist / s.ring_radius).powf(s.ring_falloff_exponent) * s.ring_strength
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(seed: u64) -> ClimateMap {
        ClimateMap::new(seed, ClimateSettings::default())
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let m = map(1337);
        let pos = Vec2::new(4312.0, -1870.5);
        let a = m.evaluate(pos, 35.0);
        let b = m.evaluate(pos, 35.0);
        assert_eq!(a.temperature.to_bits(), b.temperature.to_bits());
        assert_eq!(a.moisture.to_bits(), b.moisture.to_bits());
        assert_eq!(a.ring_bias.to_bits(), b.ring_bias.to_bits());
    }

    #[test]
    fn test_temperature_drops_with_latitude_and_altitude() {
        let m = ClimateMap::new(
            9,
            ClimateSettings {
                temperature_noise_amplitude: 0.0,
                ..ClimateSettings::default()
            },
        );
        let equator = m.temperature(Vec2::new(0.0, 0.0), 0.0);
        let far = m.temperature(Vec2::new(0.0, 10_000.0), 0.0);
        let high = m.temperature(Vec2::new(0.0, 0.0), 1000.0);
        assert!((equator - 15.0).abs() < 1e-4);
        assert!((far - (15.0 - 20.0)).abs() < 1e-4);
        assert!((high - (15.0 - 6.5)).abs() < 1e-4);
    }

    #[test]
    fn test_moisture_clamped() {
        let m = map(4);
        for i in 0..200 {
            let pos = Vec2::new(i as f32 * 137.0, i as f32 * -89.0);
            let v = m.moisture(pos);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_tile_climate_matches_pointwise_evaluation() {
        use crate::heightfield::{HeightfieldGenerator, HeightfieldSettings};
        use veldt_common::coords::TileCoord;

        let tile = HeightfieldGenerator::new(1337, HeightfieldSettings::default())
            .generate(TileCoord::new(2, -4))
            .unwrap();
        let m = map(1337);

        let grid = m.tile_climate(&tile);
        assert_eq!(grid.len(), 4096);
        for &(x, y) in &[(0u32, 0u32), (31, 17), (63, 63)] {
            let idx = (y * tile.resolution + x) as usize;
            let expected = m.evaluate(tile.sample_position(x, y), tile.height_at(x, y));
            assert_eq!(grid[idx].temperature.to_bits(), expected.temperature.to_bits());
            assert_eq!(grid[idx].moisture.to_bits(), expected.moisture.to_bits());
            assert_eq!(grid[idx].ring_bias.to_bits(), expected.ring_bias.to_bits());
        }
    }

    #[test]
    fn test_ring_bias_shape() {
        let m = map(2);
        assert!((m.ring_bias(Vec2::ZERO) - 1.0).abs() < 1e-6);
        assert_eq!(m.ring_bias(Vec2::new(5000.0, 0.0)), 0.0);
        assert_eq!(m.ring_bias(Vec2::new(9000.0, 2000.0)), 0.0);
        let near = m.ring_bias(Vec2::new(500.0, 0.0));
        let mid = m.ring_bias(Vec2::new(2500.0, 0.0));
        assert!(near > mid && mid > 0.0);
    }
}
