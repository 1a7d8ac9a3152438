//! Request ledger: every outstanding request plus the FIFO pending queue.

use crate::notify::Subscription;
use crate::slot::ContainerRef;
use reel_core::{RequestId, SlotIndex};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Where a request currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryStatus {
    Pending,
    Assigned(SlotIndex),
}

/// One outstanding request.
pub(crate) struct Entry {
    pub(crate) id: RequestId,
    pub(crate) source: String,
    pub(crate) container: ContainerRef,
    pub(crate) subscription: Arc<Subscription>,
    pub(crate) status: EntryStatus,
}

impl Entry {
    pub(crate) fn new(
        id: RequestId,
        source: String,
        container: ContainerRef,
        subscription: Arc<Subscription>,
    ) -> Self {
        Self {
            id,
            source,
            container,
            subscription,
            status: EntryStatus::Pending,
        }
    }
}

#[derive(Default)]
pub(crate) struct RequestLedger {
    entries: HashMap<RequestId, Entry>,
    pending: VecDeque<RequestId>,
}

impl RequestLedger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn status(&self, id: &str) -> Option<EntryStatus> {
        self.entries.get(id).map(|e| e.status)
    }

    /// Record an entry holding `slot`.
    pub(crate) fn insert_assigned(&mut self, mut entry: Entry, slot: SlotIndex) {
        debug_assert!(!self.entries.contains_key(&entry.id));
        entry.status = EntryStatus::Assigned(slot);
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Record an entry at the back of the pending queue.
    pub(crate) fn enqueue(&mut self, mut entry: Entry) {
        debug_assert!(!self.entries.contains_key(&entry.id));
        entry.status = EntryStatus::Pending;
        self.pending.push_back(entry.id.clone());
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Remove an entry wherever it is.
    pub(crate) fn remove(&mut self, id: &str) -> Option<Entry> {
        let entry = self.entries.remove(id)?;
        if entry.status == EntryStatus::Pending {
            self.pending.retain(|queued| queued.as_str() != id);
        }
        Some(entry)
    }

    /// Take the oldest pending entry out of the ledger.
    pub(crate) fn pop_pending(&mut self) -> Option<Entry> {
        while let Some(id) = self.pending.pop_front() {
            if let Some(entry) = self.entries.remove(&id) {
                return Some(entry);
            }
        }
        None
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn assigned_len(&self) -> usize {
        self.entries.len() - self.pending.len()
    }

    /// Pending ids, oldest first.
    pub(crate) fn pending_ids(&self) -> impl Iterator<Item = &RequestId> {
        self.pending.iter()
    }
}
