//! Error types for the Veldt terrain engine.

use thiserror::Error;

use crate::coords::TileCoord;

/// Top-level error type for Veldt operations.
#[derive(Debug, Error)]
pub enum VeldtError {
    /// Terrain generation errors
    #[error("Generation error: {0}")]
    Gen(#[from] GenError),

    /// Terrain-delta journal errors
    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),
}

/// Per-tile generation errors. Always recoverable: the streaming cache logs
/// the failure, skips the tile, and retries on a later update.
#[derive(Debug, Error)]
pub enum GenError {
    /// Heightfield resolution is not usable
    #[error("Invalid heightfield resolution {0} (must be >= 2)")]
    InvalidResolution(u32),

    /// A generated sample was NaN or infinite
    #[error("Non-finite height sample at index {index} of tile {tile}")]
    NonFiniteSample {
        /// Affected tile
        tile: TileCoord,
        /// Row-major sample index
        index: usize,
    },

    /// The requested tile is not resident in the cache
    #[error("Tile {0} is not cached")]
    TileNotCached(TileCoord),
}

/// Terrain-delta container decode errors, surfaced to the (external)
/// persistence layer.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Container magic bytes did not match
    #[error("Invalid terrain-delta container format")]
    InvalidFormat,

    /// Container version cannot be read by this build
    #[error("Unsupported terrain-delta version {0}")]
    UnsupportedVersion(i32),

    /// Container ended before the declared record count
    #[error("Truncated terrain-delta container: {0}")]
    Truncated(String),

    /// A record failed to decode
    #[error("Failed to decode terrain-delta record: {0}")]
    DecodeFailed(String),

    /// A record failed to encode
    #[error("Failed to encode terrain-delta record: {0}")]
    EncodeFailed(String),
}

/// Result type alias for generation operations.
pub type GenResult<T> = Result<T, GenError>;

/// Result type alias for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;

/// Result type alias for Veldt operations.
pub type VeldtResult<T> = Result<T, VeldtError>;
