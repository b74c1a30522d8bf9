//! Content digests for snapshot files
//!
//! The persistent store remembers the digest of the snapshot bytes it last
//! loaded or wrote. A different digest on disk at flush time means another
//! worker rewrote the file in between.

use serde::{Deserialize, Serialize};
use std::fmt;

/// xxHash64 digest of a snapshot file's bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(u64);

impl ContentDigest {
    /// Compute the digest of `data`
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh64::xxh64(data, 0))
    }

    /// Verify data against this digest
    #[must_use]
    pub fn verify(&self, data: &[u8]) -> bool {
        Self::compute(data) == *self
    }

    /// Raw digest value
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
