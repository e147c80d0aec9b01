//! Terrain-edit delta records and their container encoding.
//!
//! The world itself is never persisted; only the deltas players apply to it
//! are. An external save system owns the file; this module owns the record
//! schema, the container framing, and replay ordering.

use std::io::Cursor;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use veldt_common::coords::TileCoord;
use veldt_common::error::{JournalError, JournalResult};
use veldt_common::ids::EditId;
use veldt_common::version::MagicBytes;

use veldt_worldgen::heightfield::EditOp;

/// Current container version.
pub const JOURNAL_VERSION: i32 = 1;

/// Lower bound on an encoded record's size (the real encoding is larger).
/// Caps pre-allocation so a corrupt header count cannot request an
/// arbitrarily large buffer before a single record has decoded.
const MIN_RECORD_SIZE: usize = 44;

/// One recorded terrain edit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainDelta {
    /// Unique ID assigned when the edit was first applied.
    pub id: EditId,
    /// World-space center of the edit.
    pub center: Vec2,
    /// Influence radius in world units.
    pub radius: f32,
    /// Operation strength.
    pub strength: f32,
    /// What the edit did.
    pub op: EditOp,
    /// Tile owning the edit center.
    pub affected_tile: TileCoord,
    /// Seconds since the Unix epoch when the edit was applied. Replay order
    /// key; never feeds generation.
    pub timestamp: f64,
}

/// Encodes deltas into a self-describing container:
/// magic, version, record count, then bincode records.
pub fn encode_deltas(deltas: &[TerrainDelta]) -> JournalResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(12 + deltas.len() * 64);
    buf.extend_from_slice(&MagicBytes::TERRAIN_DELTA.0);
    buf.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
    buf.extend_from_slice(&(deltas.len() as i32).to_le_bytes());
    for delta in deltas {
        bincode::serialize_into(&mut buf, delta)
            .map_err(|e| JournalError::EncodeFailed(e.to_string()))?;
    }
    Ok(buf)
}

/// Decodes a delta container, validating magic, version, and record count.
pub fn decode_deltas(bytes: &[u8]) -> JournalResult<Vec<TerrainDelta>> {
    if bytes.len() < 12 {
        return Err(JournalError::Truncated(format!(
            "container is {} bytes, header needs 12",
            bytes.len()
        )));
    }
    if bytes[0..4] != MagicBytes::TERRAIN_DELTA.0 {
        return Err(JournalError::InvalidFormat);
    }

    let version = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != JOURNAL_VERSION {
        return Err(JournalError::UnsupportedVersion(version));
    }

    let count = i32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    if count < 0 {
        return Err(JournalError::Truncated(format!("negative record count {count}")));
    }

    let payload = &bytes[12..];
    let mut cursor = Cursor::new(payload);
    let mut deltas = Vec::with_capacity((count as usize).min(payload.len() / MIN_RECORD_SIZE));
    for i in 0..count {
        let delta: TerrainDelta = bincode::deserialize_from(&mut cursor).map_err(|e| {
            JournalError::Truncated(format!("record {i} of {count}: {e}"))
        })?;
        deltas.push(delta);
    }

    debug!(records = deltas.len(), "decoded terrain-delta container");
    Ok(deltas)
}

/// Sorts deltas into replay order: ascending timestamp, edit ID as the
/// deterministic tiebreak for identical timestamps.
pub fn sort_for_replay(deltas: &mut [TerrainDelta]) {
    deltas.sort_by(|a, b| {
        a.timestamp
            .total_cmp(&b.timestamp)
            .then_with(|| a.id.raw().cmp(&b.id.raw()))
    });
}
