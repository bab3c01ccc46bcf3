//! Simulation events.

use ticketin_models::{CustomerId, EventId, VendorId};
use ticketin_pool::TicketId;

use crate::worker::WorkerId;

/// Events broadcast while tickets move and workers come and go.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    /// A worker task began its loop.
    WorkerStarted {
        worker: WorkerId,
        event_id: EventId,
    },
    /// A vendor put a ticket into a pool.
    TicketReleased {
        vendor_id: VendorId,
        event_id: EventId,
        ticket_id: TicketId,
    },
    /// A release was refused because the pool is at capacity.
    PoolFull {
        vendor_id: VendorId,
        event_id: EventId,
    },
    /// A customer bought a ticket.
    TicketPurchased {
        customer_id: CustomerId,
        event_id: EventId,
        ticket_id: TicketId,
    },
    /// A purchase found no available ticket.
    PoolEmpty {
        customer_id: CustomerId,
        event_id: EventId,
    },
    /// A worker terminated on a panic or an unexpected error.
    WorkerFaulted {
        worker: WorkerId,
        reason: String,
    },
    /// A worker left its loop after shutdown was signalled.
    WorkerStopped {
        worker: WorkerId,
        attempts: u64,
        successes: u64,
    },
}

impl SimulationEvent {
    /// Returns the event (the ticketed kind) this refers to, if any.
    pub fn event_id(&self) -> Option<&EventId> {
        match self {
            SimulationEvent::WorkerStarted { event_id, .. }
            | SimulationEvent::TicketReleased { event_id, .. }
            | SimulationEvent::PoolFull { event_id, .. }
            | SimulationEvent::TicketPurchased { event_id, .. }
            | SimulationEvent::PoolEmpty { event_id, .. } => Some(event_id),
            SimulationEvent::WorkerFaulted { .. } | SimulationEvent::WorkerStopped { .. } => None,
        }
    }

    /// Returns true if this is a fault event.
    pub fn is_fault(&self) -> bool {
        matches!(self, SimulationEvent::WorkerFaulted { .. })
    }
}
