//! Collaborators the runtime depends on.
//!
//! Workers and the ticket service only see these two seams: where events
//! come from, and where ticket state is mirrored to.

use ticketin_models::EventId;
use ticketin_persistence::{PersistenceError, TicketStore};
use ticketin_pool::{EventItem, PoolSnapshot, Ticket};

/// Lookup of events and their pools.
pub trait EventDirectory: Send + Sync {
    /// Returns the event with the given id. The returned item shares its
    /// pool with the directory's copy.
    fn find_event(&self, id: &EventId) -> Option<EventItem>;
}

/// Durable mirror of ticket state.
///
/// Called after every successful release and purchase, outside the pool
/// lock. The in-memory pool stays authoritative: an error here is logged by
/// the caller and never undoes the pool change.
pub trait TicketPersistence: Send + Sync {
    fn persist_ticket(&self, ticket: &Ticket) -> Result<(), PersistenceError>;

    fn persist_pool(&self, snapshot: &PoolSnapshot) -> Result<(), PersistenceError>;
}

impl TicketPersistence for TicketStore {
    fn persist_ticket(&self, ticket: &Ticket) -> Result<(), PersistenceError> {
        self.save_ticket(ticket).map(|_| ())
    }

    fn persist_pool(&self, snapshot: &PoolSnapshot) -> Result<(), PersistenceError> {
        self.save_pool(snapshot).map(|_| ())
    }
}

/// Persistence that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPersistence;

impl TicketPersistence for NoopPersistence {
    fn persist_ticket(&self, _ticket: &Ticket) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn persist_pool(&self, _snapshot: &PoolSnapshot) -> Result<(), PersistenceError> {
        Ok(())
    }
}
