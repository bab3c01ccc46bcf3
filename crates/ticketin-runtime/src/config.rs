//! Simulation configuration.

use std::time::Duration;

/// Configuration for a simulation batch.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Time span a rate is measured against. A worker with rate `r` makes one
    /// attempt every `rate_unit / r`.
    pub rate_unit: Duration,
    /// How long `stop` waits for all workers before aborting the rest.
    pub join_timeout: Duration,
    /// Buffer size of the simulation event channel.
    pub event_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rate_unit: Duration::from_secs(1),
            join_timeout: Duration::from_secs(10),
            event_capacity: 256,
        }
    }
}

impl SimulationConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rate unit.
    pub fn with_rate_unit(mut self, unit: Duration) -> Self {
        self.rate_unit = unit;
        self
    }

    /// Sets the join timeout.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Sets the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
