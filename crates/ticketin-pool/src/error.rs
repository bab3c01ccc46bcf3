//! Error types for pool operations.

use thiserror::Error;
use ticketin_models::EventId;

/// Outcomes of pool operations that did not produce a ticket.
///
/// `Full` and `Empty` are the normal steady state of a bounded pool under
/// contention. The other variants indicate a bug or corrupted input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Pool is at capacity.
    #[error("ticket pool for {event_id} is at capacity {max_pool_size}")]
    Full {
        event_id: EventId,
        max_pool_size: usize,
    },

    /// No available ticket to sell.
    #[error("ticket pool for {event_id} has no available tickets")]
    Empty { event_id: EventId },

    /// Lock poisoned (thread panicked while holding lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// A persisted snapshot does not satisfy the pool invariants.
    #[error("invalid pool snapshot: {0}")]
    InvalidSnapshot(String),
}

impl PoolError {
    /// Returns true for the capacity outcomes a worker simply retries.
    pub fn is_capacity_outcome(&self) -> bool {
        matches!(self, PoolError::Full { .. } | PoolError::Empty { .. })
    }
}

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
