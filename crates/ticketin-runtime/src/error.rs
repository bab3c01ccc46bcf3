//! Error types for the runtime crate.

use thiserror::Error;
use ticketin_models::EventId;
use ticketin_pool::PoolError;

use crate::simulation::BatchReport;
use crate::worker::WorkerId;

/// Reasons a batch or a single-shot call cannot run at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    /// No vendors were supplied.
    #[error("no vendors to simulate")]
    NoVendors,

    /// No customers were supplied.
    #[error("no customers to simulate")]
    NoCustomers,

    /// No events were supplied.
    #[error("no events to simulate")]
    NoEvents,

    /// Event has no ticket pool.
    #[error("event {0} has no ticket pool")]
    MissingPool(EventId),

    /// A worker rate of zero would never attempt anything.
    #[error("{who} has invalid rate {rate}, must be at least 1")]
    InvalidRate { who: String, rate: u32 },
}

/// Errors that can occur in the runtime.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// Event not found in the directory.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// Invalid batch or call setup.
    #[error("setup error: {0}")]
    Setup(#[from] SetupError),

    /// A batch is already running.
    #[error("simulation already running")]
    AlreadyRunning,

    /// Workers that did not finish before the join timeout and were aborted.
    /// `report` holds what the other workers did up to the stop.
    #[error("{} worker(s) did not stop in time and were aborted", .workers.len())]
    Stragglers {
        workers: Vec<WorkerId>,
        report: Box<BatchReport>,
    },

    /// Unexpected pool failure.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
