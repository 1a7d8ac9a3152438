//! Error types for the playback pool.

use crate::ids::RequestId;
use thiserror::Error;

/// Errors surfaced by pool operations.
///
/// Only `InvalidConfig`, `Serialization` and `Io` are returned from fallible
/// calls. The remaining variants describe the outcome of a single request and
/// are delivered through its ticket or `on_assigned` callback.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The container was not live or refused the element at assignment time.
    #[error("Invalid request {id}: {reason}")]
    InvalidRequest { id: RequestId, reason: String },

    /// A newer request with the same id replaced this one.
    #[error("Request {id} superseded by a newer request")]
    Superseded { id: RequestId },

    /// The request was released before a slot was granted.
    #[error("Request {id} cancelled before assignment")]
    Cancelled { id: RequestId },

    /// The pending queue is bounded and already full.
    #[error("Request {id} rejected: pending queue full ({limit})")]
    QueueFull { id: RequestId, limit: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PoolError {
    /// Request id this outcome refers to, if any.
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            Self::InvalidRequest { id, .. }
            | Self::Superseded { id }
            | Self::Cancelled { id }
            | Self::QueueFull { id, .. } => Some(id),
            Self::InvalidConfig(_) | Self::Serialization(_) | Self::Io(_) => None,
        }
    }
}

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
