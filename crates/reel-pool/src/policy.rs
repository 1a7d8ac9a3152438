//! Assignment policy: grant, create, evict or queue.

use crate::slot::Slot;
use reel_core::{PoolConfig, RequestId, SlotIndex};

/// What to do with an incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Hand over this free slot.
    Grant(SlotIndex),
    /// Create a new slot; the inventory is below its bound.
    Create,
    /// Reclaim this slot from its owner.
    Evict(SlotIndex),
    /// Wait in the pending queue.
    Queue,
}

/// Pure decision logic over a slot inventory.
#[derive(Debug, Clone, Copy)]
pub struct AssignmentPolicy {
    max_slots: usize,
    protected_recent: usize,
}

impl AssignmentPolicy {
    pub fn new(max_slots: usize, protected_recent: usize) -> Self {
        Self {
            max_slots,
            protected_recent,
        }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.max_slots, config.protected_recent)
    }

    pub fn decide(&self, slots: &[Slot], requester: &RequestId) -> Decision {
        if let Some(decision) = self.vacancy(slots) {
            return decision;
        }
        match self.select_victim(slots, requester) {
            Some(index) => Decision::Evict(index),
            None => Decision::Queue,
        }
    }

    /// A free slot (lowest index first) or room to create one.
    pub fn vacancy(&self, slots: &[Slot]) -> Option<Decision> {
        if let Some(slot) = slots.iter().find(|s| s.is_free()) {
            return Some(Decision::Grant(slot.index()));
        }
        (slots.len() < self.max_slots).then_some(Decision::Create)
    }

    /// Least recently used assigned slot not owned by `requester`, skipping
    /// the `protected_recent` freshest ones. Ties on `last_used` go to the
    /// earlier assignment, then to the lower index.
    pub fn select_victim(&self, slots: &[Slot], requester: &RequestId) -> Option<SlotIndex> {
        let mut assigned: Vec<&Slot> = slots.iter().filter(|s| !s.is_free()).collect();
        assigned.sort_by_key(|s| (s.last_used(), s.assigned_at(), s.index()));

        let eligible = assigned.len().saturating_sub(self.protected_recent);
        assigned[..eligible]
            .iter()
            .find(|s| s.owner() != Some(requester))
            .map(|s| s.index())
    }
}
