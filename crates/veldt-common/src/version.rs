//! Versioning constants and file magic for persisted data.

/// World-generation algorithm version, folded into tile checksums so that
/// persisted data generated by an older pipeline fails validation.
pub const WORLDGEN_VERSION: i32 = 1;

/// Magic bytes for file format identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicBytes(pub [u8; 4]);

impl MagicBytes {
    /// Terrain-delta journal magic bytes.
    pub const TERRAIN_DELTA: Self = Self(*b"VLTD");
}
