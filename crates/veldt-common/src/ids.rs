//! ID types for terrain edits.

use serde::{Deserialize, Serialize};

/// Unique 128-bit identifier for a terrain edit, generated once when the
/// edit is recorded and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditId(u128);

impl EditId {
    /// Creates a new random edit ID.
    #[must_use]
    pub fn new() -> Self {
        // Two independent draws; fastrand's global state is only used here,
        // never in terrain generation.
        let hi = u128::from(fastrand::u64(..));
        let lo = u128::from(fastrand::u64(..));
        Self((hi << 64) | lo)
    }

    /// Creates an edit ID from a raw value (for deserialization).
    #[must_use]
    pub const fn from_raw(value: u128) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u128 {
        self.0
    }

    /// Null/invalid edit ID.
    pub const NULL: Self = Self(0);

    /// Checks if this is a valid (non-null) edit ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for EditId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EditId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
