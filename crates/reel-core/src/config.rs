//! Pool configuration with a versioned JSON document format.

use crate::error::{PoolError, Result};
use crate::playback_budget;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current config document version.
pub const CURRENT_VERSION: u32 = 1;

/// Tunables for a playback pool. Fixed once the pool is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on slots (real decoding resources).
    pub max_slots: usize,
    /// Create every slot on `init` instead of on first demand.
    pub preallocate: bool,
    /// Number of most recently used slots that are never chosen as eviction
    /// victims. With `protected_recent >= max_slots` the pool only queues.
    pub protected_recent: usize,
    /// Bound on the pending queue. `None` lets it grow without limit.
    pub max_pending: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_slots: playback_budget::DEFAULT_MAX_SLOTS,
            preallocate: true,
            protected_recent: playback_budget::DEFAULT_PROTECTED_RECENT,
            max_pending: None,
        }
    }
}

impl PoolConfig {
    /// Config with the given slot bound and defaults elsewhere.
    pub fn with_max_slots(max_slots: usize) -> Self {
        Self {
            max_slots,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_slots == 0 {
            return Err(PoolError::InvalidConfig(
                "max_slots must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Versioned config document as stored on disk.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Schema version. Missing means a pre-versioning document.
    #[serde(default)]
    pub version: u32,
    /// The pool settings.
    #[serde(default)]
    pub pool: PoolConfig,
}

impl ConfigFile {
    pub fn new(pool: PoolConfig) -> Self {
        Self {
            version: CURRENT_VERSION,
            pool,
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| PoolError::Serialization(format!("Failed to serialize config: {}", e)))
    }

    /// Deserialize from JSON bytes and validate.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| PoolError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if version > CURRENT_VERSION {
            return Err(PoolError::Serialization(format!(
                "Config version {} is newer than supported version {}",
                version, CURRENT_VERSION
            )));
        }

        let mut file: ConfigFile = serde_json::from_value(raw)
            .map_err(|e| PoolError::Serialization(format!("Failed to parse config: {}", e)))?;
        file.version = CURRENT_VERSION;
        file.pool.validate()?;
        Ok(file)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}
