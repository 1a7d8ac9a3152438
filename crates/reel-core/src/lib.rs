//! Reel Core - Shared vocabulary for the playback pool
//!
//! This crate provides the types used throughout Reel:
//! - Request and slot identifiers
//! - The logical clock used for recency ordering
//! - Pool configuration and its JSON document format
//! - The pool error taxonomy

pub mod config;
pub mod error;
pub mod ids;

pub use config::{ConfigFile, PoolConfig};
pub use error::{PoolError, Result};
pub use ids::{RequestId, SlotIndex, Tick};

/// Playback budget defaults for a typical browser-class host.
pub mod playback_budget {
    /// Simultaneously decoding video elements before hosts start to degrade.
    pub const DEFAULT_MAX_SLOTS: usize = 4;

    /// Most recently used slots shielded from eviction.
    pub const DEFAULT_PROTECTED_RECENT: usize = 1;
}
