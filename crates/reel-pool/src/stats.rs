//! Pool occupancy snapshots and lifetime counters.

use serde::Serialize;

/// Point-in-time occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PoolStats {
    /// Slots created so far.
    pub total: usize,
    /// Slots currently assigned.
    pub in_use: usize,
    /// Requests waiting in the pending queue.
    pub pending: usize,
}

impl PoolStats {
    pub fn free(&self) -> usize {
        self.total - self.in_use
    }
}

/// Totals since the pool was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PoolCounters {
    pub grants: u64,
    pub evictions: u64,
    pub superseded: u64,
    pub queued: u64,
    pub released: u64,
    /// Requests refused: dead or refusing container, or a full queue.
    pub failures: u64,
}
