//! Pool manager: the orchestrator over slots, ledger and policy.
//!
//! A [`PoolManager`] is an explicit, cheaply clonable handle; every clone
//! shares one state. Create one per process (or per page), hand clones to
//! whoever needs playback, call [`PoolManager::init`] once or many times.
//! There is no teardown: slots live as long as the last handle.
//!
//! Each operation runs atomically under one lock. Notifications collected
//! during the operation are dispatched after the lock is released, so
//! callbacks may call back into the pool.

use crate::ledger::{Entry, EntryStatus, RequestLedger};
use crate::notify::{Batch, Callbacks, Dispatch, Reason, Subscription, Ticket};
use crate::policy::{AssignmentPolicy, Decision};
use crate::slot::{ContainerRef, ElementFactory, Slot};
use crate::stats::{PoolCounters, PoolStats};
use parking_lot::Mutex;
use reel_core::{PoolConfig, RequestId, Result, SlotIndex, Tick};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handle to a playback pool.
#[derive(Clone)]
pub struct PoolManager {
    shared: Arc<Shared>,
}

struct Shared {
    config: PoolConfig,
    policy: AssignmentPolicy,
    factory: Box<dyn ElementFactory>,
    state: Mutex<PoolState>,
}

struct PoolState {
    initialized: bool,
    slots: Vec<Slot>,
    ledger: RequestLedger,
    clock: Tick,
    counters: PoolCounters,
}

impl PoolManager {
    /// Create a pool. No slots exist until [`init`](Self::init) or the
    /// first request.
    pub fn new(config: PoolConfig, factory: impl ElementFactory + 'static) -> Result<Self> {
        config.validate()?;
        let policy = AssignmentPolicy::from_config(&config);
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                policy,
                factory: Box::new(factory),
                state: Mutex::new(PoolState {
                    initialized: false,
                    slots: Vec::new(),
                    ledger: RequestLedger::new(),
                    clock: Tick::ZERO,
                    counters: PoolCounters::default(),
                }),
            }),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    pub fn max_slots(&self) -> usize {
        self.shared.config.max_slots
    }

    /// Prepare the slot inventory. Idempotent; returns how many slots this
    /// call created (always 0 after the first call).
    pub fn init(&self) -> usize {
        let mut state = self.shared.state.lock();
        self.shared.ensure_init(&mut state)
    }

    /// Ask for a slot to play `source_url` inside `container`.
    ///
    /// An outstanding request with the same id is superseded first. The
    /// outcome arrives through the returned ticket and `on_assigned`, either
    /// before this call returns or after a later release frees a slot.
    pub fn request(
        &self,
        id: impl Into<RequestId>,
        source_url: impl Into<String>,
        container: ContainerRef,
        callbacks: Callbacks,
    ) -> Ticket {
        let id = id.into();
        let (subscription, ticket) = Subscription::new(id.clone(), callbacks);
        let entry = Entry::new(id, source_url.into(), container, subscription);

        let mut batch = Batch::new();
        {
            let mut state = self.shared.state.lock();
            self.shared.ensure_init(&mut state);

            if let Some(previous) = state.ledger.remove(entry.id.as_str()) {
                debug!(id = %entry.id, "Superseding outstanding request");
                state.counters.superseded += 1;
                state.end_entry(previous, Reason::Superseded, &mut batch);
            }

            self.shared.admit(&mut state, entry, &mut batch);
            // A superseded slot left free by a rejected re-request goes to the queue.
            self.shared.drain_pending(&mut state, &mut batch);
        }
        batch.run();
        ticket
    }

    /// Drop a request. Frees its slot and hands it to the oldest pending
    /// request. Returns `false` when `id` was not outstanding.
    pub fn release(&self, id: &str) -> bool {
        let mut batch = Batch::new();
        {
            let mut state = self.shared.state.lock();
            let Some(entry) = state.ledger.remove(id) else {
                return false;
            };

            let freed = entry.status != EntryStatus::Pending;
            debug!(id = %entry.id, freed, "Releasing request");
            state.counters.released += 1;
            state.end_entry(entry, Reason::Released, &mut batch);

            if freed {
                self.shared.drain_pending(&mut state, &mut batch);
            }
        }
        batch.run();
        true
    }

    /// Mark an assigned request as recently used, moving it to the back of
    /// the eviction order. Returns `false` unless `id` holds a slot.
    pub fn touch(&self, id: &str) -> bool {
        let mut state = self.shared.state.lock();
        let Some(EntryStatus::Assigned(index)) = state.ledger.status(id) else {
            return false;
        };
        let now = state.clock.advance();
        state.slots[index.0].touch(now)
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        let in_use = state.slots.iter().filter(|s| !s.is_free()).count();
        debug_assert_eq!(in_use, state.ledger.assigned_len());
        PoolStats {
            total: state.slots.len(),
            in_use,
            pending: state.ledger.pending_len(),
        }
    }

    pub fn counters(&self) -> PoolCounters {
        self.shared.state.lock().counters
    }

    /// Slot currently held by `id`.
    pub fn slot_of(&self, id: &str) -> Option<SlotIndex> {
        match self.shared.state.lock().ledger.status(id) {
            Some(EntryStatus::Assigned(index)) => Some(index),
            _ => None,
        }
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.shared.state.lock().ledger.status(id) == Some(EntryStatus::Pending)
    }

    /// Pending request ids, oldest first.
    pub fn pending_ids(&self) -> Vec<RequestId> {
        self.shared.state.lock().ledger.pending_ids().cloned().collect()
    }
}

impl Shared {
    fn ensure_init(&self, state: &mut PoolState) -> usize {
        if state.initialized {
            return 0;
        }
        state.initialized = true;

        let mut created = 0;
        if self.config.preallocate {
            while state.slots.len() < self.config.max_slots {
                self.create_slot(state);
                created += 1;
            }
        }
        info!(
            max_slots = self.config.max_slots,
            created,
            preallocate = self.config.preallocate,
            "Playback pool initialized"
        );
        created
    }

    fn create_slot(&self, state: &mut PoolState) -> SlotIndex {
        let index = SlotIndex(state.slots.len());
        let element = self.factory.create(index);
        debug!(slot = %index, element = element.element_id(), "Created playback slot");
        state.slots.push(Slot::new(index, element));
        index
    }

    /// Resolve a free slot from a vacancy decision, creating it if needed.
    fn claim_vacancy(&self, state: &mut PoolState) -> Option<SlotIndex> {
        match self.policy.vacancy(&state.slots)? {
            Decision::Grant(index) => Some(index),
            Decision::Create => Some(self.create_slot(state)),
            Decision::Evict(_) | Decision::Queue => None,
        }
    }

    fn admit(&self, state: &mut PoolState, entry: Entry, batch: &mut Batch) {
        if !entry.container.is_live() {
            state.reject(entry, Reason::Invalid("container is not live".into()), batch);
            return;
        }

        let index = match self.policy.decide(&state.slots, &entry.id) {
            Decision::Grant(index) => index,
            Decision::Create => self.create_slot(state),
            Decision::Evict(index) => {
                state.evict(index, batch);
                index
            }
            Decision::Queue => {
                self.enqueue(state, entry, batch);
                return;
            }
        };

        if !state.grant(index, entry, batch) {
            self.drain_pending(state, batch);
        }
    }

    fn enqueue(&self, state: &mut PoolState, entry: Entry, batch: &mut Batch) {
        if let Some(limit) = self.config.max_pending {
            if state.ledger.pending_len() >= limit {
                warn!(id = %entry.id, limit, "Pending queue full, rejecting request");
                state.reject(entry, Reason::QueueFull(limit), batch);
                return;
            }
        }
        debug!(id = %entry.id, position = state.ledger.pending_len(), "No slot available, queued");
        state.counters.queued += 1;
        state.ledger.enqueue(entry);
    }

    /// Hand free slots to pending requests in FIFO order.
    fn drain_pending(&self, state: &mut PoolState, batch: &mut Batch) {
        while state.ledger.pending_len() > 0 {
            let Some(index) = self.claim_vacancy(state) else {
                break;
            };
            let Some(entry) = state.ledger.pop_pending() else {
                break;
            };
            if !entry.container.is_live() {
                state.reject(entry, Reason::Invalid("container is not live".into()), batch);
                continue;
            }
            debug!(id = %entry.id, slot = %index, "Servicing pending request");
            state.grant(index, entry, batch);
        }
    }
}

impl PoolState {
    /// Assign `index` to `entry`. Returns `false` when the container refused
    /// the element; the slot is then still free.
    fn grant(&mut self, index: SlotIndex, entry: Entry, batch: &mut Batch) -> bool {
        let now = self.clock.advance();
        let slot = &mut self.slots[index.0];
        match slot.assign(&entry.id, &entry.source, &entry.container, now) {
            Ok(handle) => {
                debug!(id = %entry.id, slot = %index, generation = handle.generation(), "Slot assigned");
                self.counters.grants += 1;
                batch.push(Dispatch::Deliver(Arc::clone(&entry.subscription), handle));
                self.ledger.insert_assigned(entry, index);
                true
            }
            Err(reason) => {
                warn!(id = %entry.id, slot = %index, %reason, "Container refused playback element");
                self.reject(entry, Reason::Invalid(reason), batch);
                false
            }
        }
    }

    fn reject(&mut self, entry: Entry, reason: Reason, batch: &mut Batch) {
        self.counters.failures += 1;
        batch.push(Dispatch::Fail(entry.subscription, reason));
    }

    /// Take `index` away from its owner, leaving it free.
    fn evict(&mut self, index: SlotIndex, batch: &mut Batch) {
        let Some(owner) = self.slots[index.0].owner().cloned() else {
            return;
        };
        debug!(victim = %owner, slot = %index, "Evicting least recently used assignment");
        self.counters.evictions += 1;
        if let Some(victim) = self.ledger.remove(owner.as_str()) {
            self.end_entry(victim, Reason::Evicted, batch);
        }
    }

    /// Vacate the entry's slot, if any, and close its subscription.
    fn end_entry(&mut self, entry: Entry, reason: Reason, batch: &mut Batch) {
        if let EntryStatus::Assigned(index) = entry.status {
            self.slots[index.0].vacate();
        }
        batch.extend(entry.subscription.close(reason));
    }
}
