//! Reel Pool - Bounded playback slot pool
//!
//! Multiplexes a fixed number of real video decoding resources across any
//! number of logical video artifacts:
//! - Slots wrap one decoding resource each and move between containers
//! - Requests are granted a free slot, take one by LRU eviction, or queue
//! - Grants and releases are reported through tickets and callbacks
//!
//! The host plugs in through [`MediaElement`], [`ElementFactory`] and
//! [`Container`]; [`headless`] provides an in-memory host.

pub mod headless;
pub mod manager;
pub mod notify;
pub mod policy;
pub mod slot;
pub mod stats;

mod ledger;

pub use manager::PoolManager;
pub use notify::{Callbacks, Outcome, Ticket};
pub use policy::{AssignmentPolicy, Decision};
pub use reel_core::{PoolConfig, PoolError, RequestId, SlotIndex};
pub use slot::{Container, ContainerRef, ElementFactory, MediaElement, Slot, SlotHandle, SlotState};
pub use stats::{PoolCounters, PoolStats};
