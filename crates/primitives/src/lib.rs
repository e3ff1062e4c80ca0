//! Core primitives for the swapscope project.
/// Change arithmetic for cumulative counters
pub mod math;
/// UTC time helpers
pub mod time;

use serde::{Deserialize, Serialize};

/// A resolved on-chain block reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block height.
    pub number: u64,
    /// Block timestamp in UTC seconds.
    pub timestamp: u64,
}

impl Block {
    /// Placeholder for "no block resolved in range". Number 0 means unresolved,
    /// not genesis; callers must filter it before using the number in a query.
    pub const SENTINEL: Self = Self { number: 0, timestamp: 0 };

    /// Whether this is the unresolved placeholder.
    pub const fn is_sentinel(&self) -> bool {
        self.number == 0 && self.timestamp == 0
    }

    /// Whether this block can be used as a historical query target.
    pub const fn is_resolved(&self) -> bool {
        !self.is_sentinel()
    }
}
