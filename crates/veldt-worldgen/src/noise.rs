//! Seeded 2D noise primitives.
//!
//! All algorithms derive their randomness from a single integer-only lattice
//! hash, so every sample is a pure function of `(seed, position, parameters)`.
//! No floating-point transcendentals feed back into the hash path, which keeps
//! output bit-identical across platforms and runs.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Hash channel for Perlin-family lattice gradients.
const CHANNEL_GRADIENT: u32 = 0;
/// Hash channel for simplex lattice gradients.
const CHANNEL_SIMPLEX: u32 = 1;
/// Hash channel for Voronoi cell feature points.
const CHANNEL_VORONOI: u32 = 4;

/// Skew factor for 2D simplex noise, `0.5 * (sqrt(3) - 1)`.
const SIMPLEX_F2: f32 = 0.366_025_4;
/// Unskew factor for 2D simplex noise, `(3 - sqrt(3)) / 6`.
const SIMPLEX_G2: f32 = 0.211_324_87;

/// Noise algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoiseKind {
    /// Classic gradient noise on the integer lattice.
    Perlin,
    /// Simplex noise (triangular lattice, fewer directional artifacts).
    Simplex,
    /// Inverted-absolute Perlin, sharpened into ridgelines.
    Ridge,
    /// Absolute Perlin with a bias, producing rounded billowy shapes.
    Billow,
    /// Distance to the nearest random cell point, for plateau/cell patterns.
    Voronoi,
}

/// Domain-warp settings. When enabled, the sample position is perturbed by a
/// secondary octave-noise field before the primary scale is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainWarp {
    /// Whether warping is applied at all.
    pub enabled: bool,
    /// Maximum displacement in world units.
    pub strength: f32,
    /// Frequency of the warp field.
    pub scale: f32,
    /// Octave count of the warp field.
    pub octaves: u32,
    /// Offset separating this warp field from other layers' warp fields.
    pub offset: Vec2,
}

impl DomainWarp {
    /// Warp disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            enabled: false,
            strength: 0.0,
            scale: 0.01,
            octaves: 2,
            offset: Vec2::ZERO,
        }
    }
}

impl Default for DomainWarp {
    fn default() -> Self {
        Self::none()
    }
}

/// Full parameter set for one noise layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParameters {
    /// Which algorithm to sample.
    pub kind: NoiseKind,
    /// Base frequency. World position is multiplied by this before lookup.
    pub scale: f32,
    /// Output amplitude, reapplied after octave normalization.
    pub amplitude: f32,
    /// Number of octaves summed.
    pub octaves: u32,
    /// Amplitude falloff per octave.
    pub persistence: f32,
    /// Frequency gain per octave.
    pub lacunarity: f32,
    /// World-space offset decorrelating this layer from others.
    pub offset: Vec2,
    /// Optional domain warp applied before scaling.
    pub warp: DomainWarp,
    /// Ridge sharpening exponent (Ridge only).
    pub ridge_sharpness: f32,
    /// Additive bias (Billow only).
    pub billow_bias: f32,
}

impl NoiseParameters {
    /// A single-layer parameter set with everything else defaulted.
    #[must_use]
    pub fn new(kind: NoiseKind, scale: f32, amplitude: f32) -> Self {
        Self {
            kind,
            scale,
            amplitude,
            ..Self::default()
        }
    }
}

impl Default for NoiseParameters {
    fn default() -> Self {
        Self {
            kind: NoiseKind::Perlin,
            scale: 0.01,
            amplitude: 1.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: Vec2::ZERO,
            warp: DomainWarp::none(),
            ridge_sharpness: 1.0,
            billow_bias: 0.0,
        }
    }
}

/// Seeded noise sampler. Copy-cheap; all state is the seed.
#[derive(Debug, Clone, Copy)]
pub struct NoiseGenerator {
    seed: u64,
}

impl NoiseGenerator {
    /// Creates a sampler for the given world seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// The world seed this sampler was built from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Integer lattice hash. LCG fold-in of each input followed by a final
    /// avalanche, so nearby lattice points decorrelate fully.
    fn hash(&self, x: i32, y: i32, channel: u32) -> u32 {
        const LCG_MUL: u32 = 1_664_525;
        const LCG_ADD: u32 = 1_013_904_223;
        let seed_lo = self.seed as u32;
        let seed_hi = (self.seed.wrapping_mul(0x9E37_79B1_85EB_CA87) >> 32) as u32;

        let mut h = x as u32;
        h = h.wrapping_mul(LCG_MUL).wrapping_add(LCG_ADD);
        h ^= y as u32;
        h = h.wrapping_mul(LCG_MUL).wrapping_add(LCG_ADD);
        h ^= seed_lo;
        h = h.wrapping_mul(LCG_MUL).wrapping_add(LCG_ADD);
        h ^= seed_hi;
        h = h.wrapping_mul(LCG_MUL).wrapping_add(LCG_ADD);
        h ^= channel;
        h = h.wrapping_mul(LCG_MUL).wrapping_add(LCG_ADD);

        h ^= h >> 16;
        h = h.wrapping_mul(0x7FEB_352D);
        h ^= h >> 15;
        h = h.wrapping_mul(0x846C_A68B);
        h ^= h >> 16;
        h
    }

    /// Hash of a continuous position, quantized to millimeter precision so
    /// that equal positions always hash equally.
    fn hash_position(&self, pos: Vec2, channel: u32) -> u32 {
        let qx = (pos.x * 1000.0).floor() as i32;
        let qy = (pos.y * 1000.0).floor() as i32;
        self.hash(qx, qy, channel)
    }

    /// Position-hashed white noise in `[-1, 1]`. Used for per-sample jitter
    /// such as climate perturbation; spatially uncorrelated by construction.
    #[must_use]
    pub fn white(&self, pos: Vec2, channel: u32) -> f32 {
        let h = self.hash_position(pos, channel);
        (h as f32 / u32::MAX as f32) * 2.0 - 1.0
    }

    /// Gradient contribution at a lattice corner: hash selects one of four
    /// pseudo-gradient directions.
    fn gradient(h: u32, x: f32, y: f32) -> f32 {
        let h = h & 3;
        let u = if h < 2 { x } else { y };
        let v = if h < 2 { y } else { x };
        let a = if h & 1 == 0 { u } else { -u };
        let b = if h & 2 == 0 { 2.0 * v } else { -2.0 * v };
        a + b
    }

    fn smoothstep(t: f32) -> f32 {
        t * t * (3.0 - 2.0 * t)
    }

    /// Single-octave Perlin at an already-scaled position.
    fn perlin(&self, pos: Vec2) -> f32 {
        let x0 = pos.x.floor() as i32;
        let y0 = pos.y.floor() as i32;
        let x1 = x0.wrapping_add(1);
        let y1 = y0.wrapping_add(1);

        let fx = pos.x - x0 as f32;
        let fy = pos.y - y0 as f32;
        let u = Self::smoothstep(fx);
        let v = Self::smoothstep(fy);

        let g00 = Self::gradient(self.hash(x0, y0, CHANNEL_GRADIENT), fx, fy);
        let g10 = Self::gradient(self.hash(x1, y0, CHANNEL_GRADIENT), fx - 1.0, fy);
        let g01 = Self::gradient(self.hash(x0, y1, CHANNEL_GRADIENT), fx, fy - 1.0);
        let g11 = Self::gradient(self.hash(x1, y1, CHANNEL_GRADIENT), fx - 1.0, fy - 1.0);

        let nx0 = g00 + u * (g10 - g00);
        let nx1 = g01 + u * (g11 - g01);
        nx0 + v * (nx1 - nx0)
    }

    /// Single-octave simplex at an already-scaled position.
    fn simplex(&self, pos: Vec2) -> f32 {
        let s = (pos.x + pos.y) * SIMPLEX_F2;
        let i = (pos.x + s).floor() as i32;
        let j = (pos.y + s).floor() as i32;

        let t = (i + j) as f32 * SIMPLEX_G2;
        let x0 = pos.x - (i as f32 - t);
        let y0 = pos.y - (j as f32 - t);

        // Which simplex triangle the sample falls in.
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f32 + SIMPLEX_G2;
        let y1 = y0 - j1 as f32 + SIMPLEX_G2;
        let x2 = x0 - 1.0 + 2.0 * SIMPLEX_G2;
        let y2 = y0 - 1.0 + 2.0 * SIMPLEX_G2;

        let mut total = 0.0;
        for &(dx, dy, gi, gj) in &[
            (x0, y0, 0, 0),
            (x1, y1, i1, j1),
            (x2, y2, 1, 1),
        ] {
            let t = 0.5 - dx * dx - dy * dy;
            if t > 0.0 {
                let t2 = t * t;
                let h = self.hash(i.wrapping_add(gi), j.wrapping_add(gj), CHANNEL_SIMPLEX);
                total += t2 * t2 * Self::gradient(h, dx, dy);
            }
        }
        70.0 * total
    }

    /// Ridge noise: invert absolute Perlin, sharpen, remap to `[-1, 1]`.
    fn ridge(&self, pos: Vec2, sharpness: f32) -> f32 {
        let n = self.perlin(pos);
        // Perlin can marginally exceed unit range; a negative powf base is NaN.
        let ridged = (1.0 - n.abs()).max(0.0).powf(sharpness);
        ridged * 2.0 - 1.0
    }

    /// Billow noise: absolute Perlin plus a bias, clamped.
    fn billow(&self, pos: Vec2, bias: f32) -> f32 {
        (self.perlin(pos).abs() + bias).clamp(-1.0, 1.0)
    }

    /// Voronoi noise: distance to the nearest jittered cell point over the
    /// 3x3 neighborhood, remapped to `[-1, 1]`.
    fn voronoi(&self, pos: Vec2) -> f32 {
        let cx = pos.x.floor() as i32;
        let cy = pos.y.floor() as i32;
        let mut min_dist = f32::MAX;

        for dy in -1..=1 {
            for dx in -1..=1 {
                let cell_x = cx.wrapping_add(dx);
                let cell_y = cy.wrapping_add(dy);
                let h = self.hash(cell_x, cell_y, CHANNEL_VORONOI);
                let jitter_x = (h & 0xFFFF) as f32 / 65_535.0;
                let jitter_y = ((h >> 16) & 0xFFFF) as f32 / 65_535.0;
                let point = Vec2::new(cell_x as f32 + jitter_x, cell_y as f32 + jitter_y);
                min_dist = min_dist.min(pos.distance(point));
            }
        }

        (min_dist * 2.0 - 1.0).clamp(-1.0, 1.0)
    }

    /// Warps a world position by a secondary octave-noise field. The warp
    /// field never warps itself.
    fn warp_position(&self, pos: Vec2, warp: &DomainWarp) -> Vec2 {
        let field = NoiseParameters {
            kind: NoiseKind::Perlin,
            scale: warp.scale,
            amplitude: 1.0,
            octaves: warp.octaves,
            warp: DomainWarp::none(),
            ..NoiseParameters::default()
        };
        let wx = self.sample(
            pos,
            &NoiseParameters {
                offset: warp.offset,
                ..field
            },
        );
        let wy = self.sample(
            pos,
            &NoiseParameters {
                offset: warp.offset + Vec2::new(1000.0, 1000.0),
                ..field
            },
        );
        pos + Vec2::new(wx, wy) * warp.strength
    }

    /// One octave: warp (if enabled), offset, scale, dispatch, amplitude.
    fn sample_octave(&self, pos: Vec2, params: &NoiseParameters) -> f32 {
        let pos = if params.warp.enabled && params.warp.strength > 0.0 {
            self.warp_position(pos, &params.warp)
        } else {
            pos
        };
        let scaled = (pos + params.offset) * params.scale;

        let raw = match params.kind {
            NoiseKind::Perlin => self.perlin(scaled),
            NoiseKind::Simplex => self.simplex(scaled),
            NoiseKind::Ridge => self.ridge(scaled, params.ridge_sharpness),
            NoiseKind::Billow => self.billow(scaled, params.billow_bias),
            NoiseKind::Voronoi => self.voronoi(scaled),
        };
        raw * params.amplitude
    }

    /// Samples the full octave stack at a world position.
    ///
    /// Octave contributions are normalized by total amplitude so the result
    /// stays in the algorithm's base range regardless of octave count, then
    /// the caller's amplitude is reapplied. Each octave is shifted by a fixed
    /// offset so octaves do not align on lattice points.
    #[must_use]
    pub fn sample(&self, pos: Vec2, params: &NoiseParameters) -> f32 {
        let octaves = params.octaves.max(1);
        let mut frequency = params.scale;
        let mut amplitude = 1.0;
        let mut total = 0.0;
        let mut max_amplitude = 0.0;

        for octave in 0..octaves {
            let octave_offset = Vec2::splat(octave as f32 * 100.0);
            let octave_params = NoiseParameters {
                scale: frequency,
                amplitude,
                offset: params.offset + octave_offset,
                ..*params
            };
            total += self.sample_octave(pos, &octave_params);
            max_amplitude += amplitude;
            amplitude *= params.persistence;
            frequency *= params.lacunarity;
        }

        (total / max_amplitude) * params.amplitude
    }

    /// Samples a row-major grid of `width * height` values starting at
    /// `origin` with uniform `spacing`.
    #[must_use]
    pub fn field(
        &self,
        origin: Vec2,
        width: usize,
        height: usize,
        spacing: f32,
        params: &NoiseParameters,
    ) -> Vec<f32> {
        let mut out = Vec::with_capacity(width * height);
        for j in 0..height {
            for i in 0..width {
                let pos = origin + Vec2::new(i as f32 * spacing, j as f32 * spacing);
                out.push(self.sample(pos, params));
            }
        }
        out
    }
}
