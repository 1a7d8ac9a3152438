//! Replays random request/release/touch sequences against a reference model.

use proptest::prelude::*;
use reel_pool::headless::{HeadlessContainer, HeadlessFactory};
use reel_pool::{Callbacks, PoolConfig, PoolManager, PoolStats, SlotIndex};
use std::collections::VecDeque;

const IDS: u8 = 6;

#[derive(Debug, Clone)]
enum Op {
    Request(u8),
    Release(u8),
    Touch(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..IDS).prop_map(Op::Request),
        2 => (0..IDS).prop_map(Op::Release),
        1 => (0..IDS).prop_map(Op::Touch),
    ]
}

#[derive(Debug, Clone, Copy)]
struct Held {
    owner: u8,
    last_used: u64,
    assigned_at: u64,
}

/// Straightforward re-statement of the pool rules over plain vectors.
struct Model {
    slots: Vec<Option<Held>>,
    pending: VecDeque<u8>,
    protected: usize,
    clock: u64,
}

impl Model {
    fn new(max_slots: usize, protected: usize) -> Self {
        Self {
            slots: vec![None; max_slots],
            pending: VecDeque::new(),
            protected,
            clock: 0,
        }
    }

    fn slot_of(&self, id: u8) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| matches!(s, Some(h) if h.owner == id))
    }

    fn assign(&mut self, index: usize, id: u8) {
        self.clock += 1;
        self.slots[index] = Some(Held {
            owner: id,
            last_used: self.clock,
            assigned_at: self.clock,
        });
    }

    fn drop_id(&mut self, id: u8) -> bool {
        if let Some(index) = self.slot_of(id) {
            self.slots[index] = None;
            return true;
        }
        self.pending.retain(|&p| p != id);
        false
    }

    fn drain(&mut self) {
        while !self.pending.is_empty() {
            let Some(free) = self.slots.iter().position(Option::is_none) else {
                break;
            };
            let id = self.pending.pop_front().unwrap();
            self.assign(free, id);
        }
    }

    fn request(&mut self, id: u8) {
        self.drop_id(id);

        if let Some(free) = self.slots.iter().position(Option::is_none) {
            self.assign(free, id);
        } else {
            let mut held: Vec<(u64, u64, usize)> = self
                .slots
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.map(|h| (h.last_used, h.assigned_at, i)))
                .collect();
            held.sort();
            let eligible = held.len().saturating_sub(self.protected);
            match held[..eligible].first() {
                Some(&(_, _, victim)) => self.assign(victim, id),
                None => self.pending.push_back(id),
            }
        }
        self.drain();
    }

    fn release(&mut self, id: u8) {
        if self.drop_id(id) {
            self.drain();
        }
    }

    fn touch(&mut self, id: u8) {
        if let Some(index) = self.slot_of(id) {
            self.clock += 1;
            if let Some(held) = self.slots[index].as_mut() {
                held.last_used = self.clock;
            }
        }
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            total: self.slots.len(),
            in_use: self.slots.iter().filter(|s| s.is_some()).count(),
            pending: self.pending.len(),
        }
    }
}

proptest! {
    #[test]
    fn pool_matches_reference_model(
        max_slots in 1usize..5,
        protected in 0usize..3,
        ops in prop::collection::vec(op(), 1..80),
    ) {
        let config = PoolConfig { max_slots, protected_recent: protected, ..Default::default() };
        let pool = PoolManager::new(config, HeadlessFactory::new()).unwrap();
        pool.init();
        let mut model = Model::new(max_slots, protected);

        for op in ops {
            match op {
                Op::Request(id) => {
                    let name = id.to_string();
                    pool.request(name.as_str(), "v.mp4", HeadlessContainer::new(name.clone()), Callbacks::new());
                    model.request(id);
                }
                Op::Release(id) => {
                    pool.release(&id.to_string());
                    model.release(id);
                }
                Op::Touch(id) => {
                    pool.touch(&id.to_string());
                    model.touch(id);
                }
            }

            let stats = pool.stats();
            prop_assert_eq!(stats, model.stats());
            prop_assert!(stats.in_use <= stats.total && stats.total <= max_slots);

            for id in 0..IDS {
                prop_assert_eq!(pool.slot_of(&id.to_string()), model.slot_of(id).map(SlotIndex));
            }
            let pending: Vec<String> = pool.pending_ids().iter().map(|p| p.to_string()).collect();
            let expected: Vec<String> = model.pending.iter().map(|p| p.to_string()).collect();
            prop_assert_eq!(pending, expected);
        }
    }

    #[test]
    fn every_delivered_grant_is_released_once(
        ops in prop::collection::vec(op(), 1..60),
    ) {
        use parking_lot::Mutex;
        use std::collections::HashMap;
        use std::sync::Arc;

        let pool = PoolManager::new(PoolConfig::with_max_slots(2), HeadlessFactory::new()).unwrap();
        let balance: Arc<Mutex<HashMap<u8, i32>>> = Arc::new(Mutex::new(HashMap::new()));

        for op in ops {
            match op {
                Op::Request(id) => {
                    let up = Arc::clone(&balance);
                    let down = Arc::clone(&balance);
                    let name = id.to_string();
                    pool.request(
                        name.as_str(),
                        "v.mp4",
                        HeadlessContainer::new(name.clone()),
                        Callbacks::new()
                            .on_assigned(move |outcome| {
                                if outcome.is_ok() {
                                    *up.lock().entry(id).or_default() += 1;
                                }
                            })
                            .on_released(move || *down.lock().entry(id).or_default() -= 1),
                    );
                }
                Op::Release(id) => {
                    pool.release(&id.to_string());
                }
                Op::Touch(id) => {
                    pool.touch(&id.to_string());
                }
            }
            for id in 0..IDS {
                let open = balance.lock().get(&id).copied().unwrap_or(0);
                let held = i32::from(pool.slot_of(&id.to_string()).is_some());
                prop_assert_eq!(open, held);
            }
        }
    }
}
