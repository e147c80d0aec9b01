//! Tile content hashing and seam validation.
//!
//! Checksums use XXH64 over the raw little-endian sample bytes, seeded with
//! the world seed, so any divergence between two runs of the same seed is
//! detectable byte-for-byte.

use serde::{Deserialize, Serialize};

use veldt_common::coords::TileCoord;

use crate::heightfield::HeightfieldTile;

/// Maximum absolute height difference allowed along a shared tile border.
pub const SEAM_TOLERANCE: f32 = 1e-3;

const PRIME64_1: u64 = 0x9E37_79B1_85EB_CA87;
const PRIME64_2: u64 = 0xC2B2_AE3D_27D4_EB4F;
const PRIME64_3: u64 = 0x1656_67B1_9E37_79F9;
const PRIME64_4: u64 = 0x85EB_CA77_C2B2_AE63;
const PRIME64_5: u64 = 0x27D4_EB2F_1656_67C5;

/// XXH64 of a byte slice with an explicit seed.
#[must_use]
pub fn xxhash64(data: &[u8], seed: u64) -> u64 {
    let len = data.len();
    let mut hash;
    let mut rest = data;

    if len >= 32 {
        let mut v1 = seed.wrapping_add(PRIME64_1).wrapping_add(PRIME64_2);
        let mut v2 = seed.wrapping_add(PRIME64_2);
        let mut v3 = seed;
        let mut v4 = seed.wrapping_sub(PRIME64_1);

        while rest.len() >= 32 {
            v1 = round(v1, read_u64(&rest[0..8]));
            v2 = round(v2, read_u64(&rest[8..16]));
            v3 = round(v3, read_u64(&rest[16..24]));
            v4 = round(v4, read_u64(&rest[24..32]));
            rest = &rest[32..];
        }

        hash = v1
            .rotate_left(1)
            .wrapping_add(v2.rotate_left(7))
            .wrapping_add(v3.rotate_left(12))
            .wrapping_add(v4.rotate_left(18));
        hash = merge_round(hash, v1);
        hash = merge_round(hash, v2);
        hash = merge_round(hash, v3);
        hash = merge_round(hash, v4);
    } else {
        hash = seed.wrapping_add(PRIME64_5);
    }

    hash = hash.wrapping_add(len as u64);

    while rest.len() >= 8 {
        let k = round(0, read_u64(&rest[0..8]));
        hash = (hash ^ k)
            .rotate_left(27)
            .wrapping_mul(PRIME64_1)
            .wrapping_add(PRIME64_4);
        rest = &rest[8..];
    }

    if rest.len() >= 4 {
        let k = u64::from(read_u32(&rest[0..4]));
        hash = (hash ^ k.wrapping_mul(PRIME64_1))
            .rotate_left(23)
            .wrapping_mul(PRIME64_2)
            .wrapping_add(PRIME64_3);
        rest = &rest[4..];
    }

    for &byte in rest {
        hash = (hash ^ u64::from(byte).wrapping_mul(PRIME64_5))
            .rotate_left(11)
            .wrapping_mul(PRIME64_1);
    }

    hash ^= hash >> 33;
    hash = hash.wrapping_mul(PRIME64_2);
    hash ^= hash >> 29;
    hash = hash.wrapping_mul(PRIME64_3);
    hash ^= hash >> 32;
    hash
}

fn round(acc: u64, input: u64) -> u64 {
    acc.wrapping_add(input.wrapping_mul(PRIME64_2))
        .rotate_left(31)
        .wrapping_mul(PRIME64_1)
}

fn merge_round(acc: u64, val: u64) -> u64 {
    (acc ^ round(0, val))
        .wrapping_mul(PRIME64_1)
        .wrapping_add(PRIME64_4)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

/// Hashes a float slice by reinterpreting it as raw little-endian bytes.
#[must_use]
pub fn hash_floats(values: &[f32], seed: u64) -> u64 {
    xxhash64(bytemuck::cast_slice(values), seed)
}

/// Content checksum of one generated tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileChecksum {
    /// XXH64 of the height samples.
    pub height_hash: u64,
    /// XXH64 of the flattened normal components.
    pub normal_hash: u64,
    /// XXH64 of the slope samples.
    pub slope_hash: u64,
    /// XXH64 binding the three content hashes to coordinate, resolution,
    /// seed, and algorithm version.
    pub combined_hash: u64,
    /// World seed the tile was generated from.
    pub seed: u64,
    /// World-generation algorithm version.
    pub version: i32,
}

/// Computes the checksum of a tile for a given seed and algorithm version.
#[must_use]
pub fn compute_checksum(tile: &HeightfieldTile, seed: u64, version: i32) -> TileChecksum {
    let height_hash = hash_floats(&tile.heights, seed);

    let mut normal_components = Vec::with_capacity(tile.normals.len() * 3);
    for n in &tile.normals {
        normal_components.extend_from_slice(&n.to_array());
    }
    let normal_hash = hash_floats(&normal_components, seed);
    let slope_hash = hash_floats(&tile.slopes, seed);

    let mut tail = Vec::with_capacity(40);
    tail.extend_from_slice(&height_hash.to_le_bytes());
    tail.extend_from_slice(&normal_hash.to_le_bytes());
    tail.extend_from_slice(&slope_hash.to_le_bytes());
    tail.extend_from_slice(&tile.coord.x.to_le_bytes());
    tail.extend_from_slice(&tile.coord.y.to_le_bytes());
    tail.extend_from_slice(&tile.resolution.to_le_bytes());
    tail.extend_from_slice(&version.to_le_bytes());
    let combined_hash = xxhash64(&tail, seed);

    TileChecksum {
        height_hash,
        normal_hash,
        slope_hash,
        combined_hash,
        seed,
        version,
    }
}

/// Recomputes a tile's checksum against an expected one. Any single-sample
/// change flips the corresponding content hash and the combined hash.
#[must_use]
pub fn validate_checksum(tile: &HeightfieldTile, expected: &TileChecksum) -> bool {
    compute_checksum(tile, expected.seed, expected.version) == *expected
}

/// Validates height continuity along the shared border of two tiles.
///
/// Returns `false` for non-adjacent tiles or mismatched resolutions. Tiles
/// sample the closed interval of their world square, so the shared border row
/// exists in both tiles at identical world positions.
#[must_use]
pub fn validate_border_seam(a: &HeightfieldTile, b: &HeightfieldTile) -> bool {
    if a.resolution != b.resolution {
        return false;
    }
    let res = a.resolution;
    let last = res - 1;

    let (edge_a, edge_b): (Vec<f32>, Vec<f32>) = match a.coord.offset_to(b.coord) {
        // b east of a: a's right column vs b's left column.
        (1, 0) => (
            (0..res).map(|i| a.height_at(last, i)).collect(),
            (0..res).map(|i| b.height_at(0, i)).collect(),
        ),
        (-1, 0) => (
            (0..res).map(|i| a.height_at(0, i)).collect(),
            (0..res).map(|i| b.height_at(last, i)).collect(),
        ),
        (0, 1) => (
            (0..res).map(|i| a.height_at(i, last)).collect(),
            (0..res).map(|i| b.height_at(i, 0)).collect(),
        ),
        (0, -1) => (
            (0..res).map(|i| a.height_at(i, 0)).collect(),
            (0..res).map(|i| b.height_at(i, last)).collect(),
        ),
        _ => return false,
    };

    edge_a
        .iter()
        .zip(&edge_b)
        .all(|(x, y)| (x - y).abs() <= SEAM_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightfield::{HeightfieldGenerator, HeightfieldSettings};
    use proptest::prelude::*;
    use veldt_common::version::WORLDGEN_VERSION;

    fn tile(seed: u64, x: i32, y: i32) -> HeightfieldTile {
        HeightfieldGenerator::new(seed, HeightfieldSettings::default())
            .generate(TileCoord::new(x, y))
            .unwrap()
    }

    #[test]
    fn test_xxhash64_reference_vectors() {
        // Published XXH64 vectors.
        assert_eq!(xxhash64(b"", 0), 0xEF46_DB37_51D8_E999);
        assert_eq!(xxhash64(b"a", 0), 0xD24E_C4F1_A98C_6E5B);
        assert_eq!(xxhash64(b"abc", 0), 0x44BC_2CF5_AD77_0999);
        assert_eq!(
            xxhash64(b"Nobody inspects the spammish repetition", 0),
            0xFBCE_A83C_8A37_8BF1
        );
    }

    #[test]
    fn test_checksum_stable_across_regeneration() {
        let a = tile(1337, 4, -9);
        let b = tile(1337, 4, -9);
        let ca = compute_checksum(&a, 1337, WORLDGEN_VERSION);
        let cb = compute_checksum(&b, 1337, WORLDGEN_VERSION);
        assert_eq!(ca, cb);
        assert!(validate_checksum(&b, &ca));
    }

    #[test]
    fn test_single_sample_mutation_invalidates() {
        let mut t = tile(42, 0, 0);
        let checksum = compute_checksum(&t, 42, WORLDGEN_VERSION);
        t.heights[1000] += 0.001;
        assert!(!validate_checksum(&t, &checksum));
        let after = compute_checksum(&t, 42, WORLDGEN_VERSION);
        assert_ne!(checksum.height_hash, after.height_hash);
        assert_ne!(checksum.combined_hash, after.combined_hash);
    }

    #[test]
    fn test_version_bump_changes_combined_hash() {
        let t = tile(7, 2, 2);
        let v1 = compute_checksum(&t, 7, 1);
        let v2 = compute_checksum(&t, 7, 2);
        assert_eq!(v1.height_hash, v2.height_hash);
        assert_ne!(v1.combined_hash, v2.combined_hash);
    }

    #[test]
    fn test_seam_validation_for_all_neighbors() {
        let center = tile(314, 0, 0);
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let neighbor = tile(314, dx, dy);
            assert!(
                validate_border_seam(&center, &neighbor),
                "seam failed toward ({dx}, {dy})"
            );
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_any_single_sample_mutation_invalidates(
            index in 0usize..4096,
            bump in 1u32..1000,
        ) {
            let mut t = tile(11, 3, 3);
            let checksum = compute_checksum(&t, 11, WORLDGEN_VERSION);
            // Smallest bump is 1e-3, well above f32 resolution at |h| <= 120.
            t.heights[index] += bump as f32 * 1e-3;
            prop_assert!(!validate_checksum(&t, &checksum));
        }
    }

    #[test]
    fn test_seam_rejects_non_adjacent_and_mismatched() {
        let a = tile(1, 0, 0);
        let diagonal = tile(1, 1, 1);
        let far = tile(1, 5, 0);
        assert!(!validate_border_seam(&a, &diagonal));
        assert!(!validate_border_seam(&a, &far));

        let small = HeightfieldGenerator::new(1, HeightfieldSettings::default())
            .generate_at_resolution(TileCoord::new(1, 0), 32)
            .unwrap();
        assert!(!validate_border_seam(&a, &small));
    }
}
