//! BlockId - the work item of the block pipeline

use std::fmt;

use serde::{Deserialize, Serialize};

/// Monotonically increasing block identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u64);

impl BlockId {
    /// Raw block number
    pub fn get(self) -> u64 {
        self.0
    }

    /// Check whether the block number is a multiple of `n` (`n == 0` never matches)
    pub fn is_multiple_of(self, n: u64) -> bool {
        n != 0 && self.0 % n == 0
    }

    /// Lazy sequence `start, start + 1, ...`, ending after `u64::MAX`
    pub fn sequence(start: u64) -> impl Iterator<Item = BlockId> + Send + 'static {
        (start..=u64::MAX).map(BlockId)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BlockId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
