//! Tile heightfield generation and editing.
//!
//! A tile is a square grid of height samples with derived per-sample normals
//! and slopes. Sample positions use closed-interval spacing: sample `i` sits
//! at `corner + i * tile_size / (resolution - 1)`, so adjacent tiles share
//! bit-identical border sample positions and therefore bit-identical border
//! heights.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use veldt_common::coords::TileCoord;
use veldt_common::error::{GenError, GenResult};

use crate::noise::{DomainWarp, NoiseGenerator, NoiseKind, NoiseParameters};

/// Samples per tile edge.
pub const TILE_RESOLUTION: u32 = 64;
/// Tile edge length in world units.
pub const TILE_SIZE: f32 = 64.0;
/// Heights are clamped to `[-MAX_TERRAIN_HEIGHT, MAX_TERRAIN_HEIGHT]`.
pub const MAX_TERRAIN_HEIGHT: f32 = 120.0;
/// Grid spacing used for normal estimation.
pub const SAMPLE_SPACING: f32 = 1.0;

/// Terrain edit operation applied to cached heightfields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditOp {
    /// Raise terrain toward the edit center.
    Add,
    /// Lower terrain toward the edit center.
    Subtract,
    /// Blend heights toward the height at the edit center.
    Flatten,
    /// Blend each sample toward its neighborhood mean.
    Smooth,
}

/// Per-layer noise configuration for heightfield composition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightfieldSettings {
    /// Broad continental shape.
    pub base: NoiseParameters,
    /// High-frequency surface detail.
    pub detail: NoiseParameters,
    /// Mountain ridgelines, blended at half weight.
    pub ridge: NoiseParameters,
    /// Constant height added before layer contributions.
    pub base_height: f32,
    /// Final multiplier over the summed layers.
    pub height_multiplier: f32,
    /// Whether thermal smoothing runs after composition.
    pub thermal_smoothing: bool,
    /// Smoothing iteration count.
    pub smoothing_iterations: u32,
    /// Fraction of the neighbor excess removed per iteration.
    pub smoothing_strength: f32,
}

impl Default for HeightfieldSettings {
    fn default() -> Self {
        Self {
            base: NoiseParameters {
                kind: NoiseKind::Perlin,
                scale: 0.005,
                amplitude: 60.0,
                octaves: 4,
                persistence: 0.5,
                lacunarity: 2.0,
                offset: Vec2::ZERO,
                warp: DomainWarp {
                    enabled: true,
                    strength: 25.0,
                    scale: 0.0025,
                    octaves: 2,
                    offset: Vec2::ZERO,
                },
                ridge_sharpness: 1.0,
                billow_bias: 0.0,
            },
            detail: NoiseParameters {
                kind: NoiseKind::Perlin,
                scale: 0.02,
                amplitude: 15.0,
                octaves: 2,
                persistence: 0.5,
                lacunarity: 2.0,
                offset: Vec2::new(1000.0, 1000.0),
                warp: DomainWarp {
                    enabled: true,
                    strength: 10.0,
                    scale: 0.01,
                    octaves: 2,
                    offset: Vec2::new(500.0, 500.0),
                },
                ridge_sharpness: 1.0,
                billow_bias: 0.0,
            },
            ridge: NoiseParameters {
                kind: NoiseKind::Ridge,
                scale: 0.003,
                amplitude: 40.0,
                octaves: 3,
                persistence: 0.5,
                lacunarity: 2.0,
                offset: Vec2::new(2000.0, 2000.0),
                warp: DomainWarp {
                    enabled: true,
                    strength: 25.0,
                    scale: 0.0015,
                    octaves: 2,
                    offset: Vec2::new(1500.0, 1500.0),
                },
                ridge_sharpness: 1.5,
                billow_bias: 0.0,
            },
            base_height: 0.0,
            height_multiplier: 1.0,
            thermal_smoothing: true,
            smoothing_iterations: 2,
            smoothing_strength: 0.1,
        }
    }
}

/// A generated tile: heights plus derived normals, slopes, and bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightfieldTile {
    /// Grid coordinate of this tile.
    pub coord: TileCoord,
    /// Samples per edge.
    pub resolution: u32,
    /// Row-major height samples, `resolution * resolution` entries.
    pub heights: Vec<f32>,
    /// Unit surface normals, one per sample.
    pub normals: Vec<Vec3>,
    /// Slope angles in degrees from horizontal, one per sample.
    pub slopes: Vec<f32>,
    /// Minimum height in this tile.
    pub min_height: f32,
    /// Maximum height in this tile.
    pub max_height: f32,
}

impl HeightfieldTile {
    /// Row-major index of sample `(x, y)`.
    #[must_use]
    pub const fn index(&self, x: u32, y: u32) -> usize {
        (y * self.resolution + x) as usize
    }

    /// Height at sample `(x, y)`.
    #[must_use]
    pub fn height_at(&self, x: u32, y: u32) -> f32 {
        self.heights[self.index(x, y)]
    }

    /// Normal at sample `(x, y)`.
    #[must_use]
    pub fn normal_at(&self, x: u32, y: u32) -> Vec3 {
        self.normals[self.index(x, y)]
    }

    /// Slope in degrees at sample `(x, y)`.
    #[must_use]
    pub fn slope_at(&self, x: u32, y: u32) -> f32 {
        self.slopes[self.index(x, y)]
    }

    /// World-space offset of sample index `i` along one axis. The last sample
    /// lands exactly on the far tile edge, shared with the neighbor tile.
    #[must_use]
    pub fn sample_offset(&self, i: u32) -> f32 {
        (i as f32 * TILE_SIZE) / (self.resolution - 1) as f32
    }

    /// World-space position of sample `(x, y)`.
    #[must_use]
    pub fn sample_position(&self, x: u32, y: u32) -> Vec2 {
        self.coord.corner(TILE_SIZE) + Vec2::new(self.sample_offset(x), self.sample_offset(y))
    }

    /// Recomputes normals, slopes, and height bounds from current heights.
    pub fn recompute_derived(&mut self) {
        let res = self.resolution;
        self.min_height = f32::MAX;
        self.max_height = f32::MIN;
        for &h in &self.heights {
            self.min_height = self.min_height.min(h);
            self.max_height = self.max_height.max(h);
        }

        // Central differences, clamped at tile edges.
        for y in 0..res {
            for x in 0..res {
                let xl = x.saturating_sub(1);
                let xr = (x + 1).min(res - 1);
                let yl = y.saturating_sub(1);
                let yr = (y + 1).min(res - 1);
                let span_x = (xr - xl) as f32 * SAMPLE_SPACING;
                let span_y = (yr - yl) as f32 * SAMPLE_SPACING;
                let dx = (self.height_at(xr, y) - self.height_at(xl, y)) / span_x;
                let dy = (self.height_at(x, yr) - self.height_at(x, yl)) / span_y;

                let normal = Vec3::new(-dx, -dy, 1.0).normalize();
                let slope = normal.z.clamp(-1.0, 1.0).acos().to_degrees();
                let idx = self.index(x, y);
                self.normals[idx] = normal;
                self.slopes[idx] = slope;
            }
        }
    }
}

/// Deterministic heightfield generator for a fixed seed and settings.
#[derive(Debug, Clone)]
pub struct HeightfieldGenerator {
    settings: HeightfieldSettings,
    noise: NoiseGenerator,
}

impl HeightfieldGenerator {
    /// Creates a generator for the given seed.
    #[must_use]
    pub fn new(seed: u64, settings: HeightfieldSettings) -> Self {
        Self {
            settings,
            noise: NoiseGenerator::new(seed),
        }
    }

    /// The settings this generator composes layers from.
    #[must_use]
    pub const fn settings(&self) -> &HeightfieldSettings {
        &self.settings
    }

    /// Generates the heightfield for a tile. Pure in `(seed, coord)`.
    pub fn generate(&self, coord: TileCoord) -> GenResult<HeightfieldTile> {
        self.generate_at_resolution(coord, TILE_RESOLUTION)
    }

    /// Generates at an explicit resolution (LOD or testing).
    pub fn generate_at_resolution(
        &self,
        coord: TileCoord,
        resolution: u32,
    ) -> GenResult<HeightfieldTile> {
        if resolution < 2 {
            return Err(GenError::InvalidResolution(resolution));
        }
        let count = (resolution * resolution) as usize;
        let mut tile = HeightfieldTile {
            coord,
            resolution,
            heights: vec![0.0; count],
            normals: vec![Vec3::Z; count],
            slopes: vec![0.0; count],
            min_height: 0.0,
            max_height: 0.0,
        };

        let s = &self.settings;
        for y in 0..resolution {
            for x in 0..resolution {
                let pos = tile.sample_position(x, y);
                let mut h = s.base_height;
                h += self.noise.sample(pos, &s.base);
                h += self.noise.sample(pos, &s.detail);
                h += self.noise.sample(pos, &s.ridge) * 0.5;
                h *= s.height_multiplier;
                h = h.clamp(-MAX_TERRAIN_HEIGHT, MAX_TERRAIN_HEIGHT);

                let idx = tile.index(x, y);
                if !h.is_finite() {
                    return Err(GenError::NonFiniteSample { tile: coord, index: idx });
                }
                tile.heights[idx] = h;
            }
        }

        if s.thermal_smoothing && s.smoothing_iterations > 0 {
            thermal_smooth(&mut tile, s.smoothing_iterations, s.smoothing_strength);
        }
        tile.recompute_derived();

        debug!(
            tile = %coord,
            min = tile.min_height,
            max = tile.max_height,
            "generated heightfield"
        );
        Ok(tile)
    }
}

/// Thermal erosion smoothing: each interior sample sheds a fraction of its
/// positive excess over the 8-neighbor mean. Border rows are never touched so
/// tile seams stay bit-identical with neighbors.
fn thermal_smooth(tile: &mut HeightfieldTile, iterations: u32, strength: f32) {
    let res = tile.resolution;
    if res < 3 {
        return;
    }
    let mut scratch = tile.heights.clone();

    for _ in 0..iterations {
        for y in 1..res - 1 {
            for x in 1..res - 1 {
                let mut neighbor_sum = 0.0;
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = (x as i32 + dx) as u32;
                        let ny = (y as i32 + dy) as u32;
                        neighbor_sum += tile.height_at(nx, ny);
                    }
                }
                let mean = neighbor_sum / 8.0;
                let idx = tile.index(x, y);
                let excess = tile.heights[idx] - mean;
                scratch[idx] = if excess > 0.0 {
                    tile.heights[idx] - excess * strength
                } else {
                    tile.heights[idx]
                };
            }
        }
        tile.heights.copy_from_slice(&scratch);
    }
}

fn smoothstep01(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Applies a radial edit to a cached tile and refreshes derived data.
///
/// Influence falls off as `1 - smoothstep(distance / radius)`, reaching zero
/// at the radius edge. Heights remain clamped to the terrain bounds.
pub fn apply_edit(tile: &mut HeightfieldTile, center: Vec2, radius: f32, strength: f32, op: EditOp) {
    if radius <= 0.0 {
        return;
    }
    let res = tile.resolution;

    // Flatten targets the height nearest the edit center; smooth reads the
    // pre-edit heights, so both are resolved against a snapshot.
    let snapshot = tile.heights.clone();
    let flatten_target = {
        let corner = tile.coord.corner(TILE_SIZE);
        let step = TILE_SIZE / (res - 1) as f32;
        let cx = (((center.x - corner.x) / step).round() as i64).clamp(0, i64::from(res - 1)) as u32;
        let cy = (((center.y - corner.y) / step).round() as i64).clamp(0, i64::from(res - 1)) as u32;
        snapshot[(cy * res + cx) as usize]
    };

    for y in 0..res {
        for x in 0..res {
            let pos = tile.sample_position(x, y);
            let dist = pos.distance(center);
            if dist >= radius {
                continue;
            }
            let falloff = 1.0 - smoothstep01(dist / radius);
            let idx = tile.index(x, y);
            let current = snapshot[idx];

            let edited = match op {
                EditOp::Add => current + strength * falloff,
                EditOp::Subtract => current - strength * falloff,
                EditOp::Flatten => {
                    let blend = (strength.clamp(0.0, 1.0)) * falloff;
                    current + (flatten_target - current) * blend
                }
                EditOp::Smooth => {
                    let mut sum = 0.0;
                    let mut count = 0.0;
                    for dy in -1i32..=1 {
                        for dx in -1i32..=1 {
                            if dx == 0 && dy == 0 {
                                continue;
                            }
                            let nx = x as i32 + dx;
                            let ny = y as i32 + dy;
                            if nx < 0 || ny < 0 || nx >= res as i32 || ny >= res as i32 {
                                continue;
                            }
                            sum += snapshot[(ny as u32 * res + nx as u32) as usize];
                            count += 1.0;
                        }
                    }
                    let mean = sum / count;
                    let blend = (strength.clamp(0.0, 1.0)) * falloff;
                    current + (mean - current) * blend
                }
            };
            tile.heights[idx] = edited.clamp(-MAX_TERRAIN_HEIGHT, MAX_TERRAIN_HEIGHT);
        }
    }

    tile.recompute_derived();
}
