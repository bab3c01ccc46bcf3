//! Single-attempt ticket operations shared by workers and the console.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use ticketin_models::{Customer, EventId, Vendor};
use ticketin_pool::{EventItem, PoolError, Ticket, TicketPool};

use crate::error::{Result, RuntimeError, SetupError};
use crate::event::SimulationEvent;
use crate::traits::{EventDirectory, TicketPersistence};

/// Result of one release attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome {
    Released(Ticket),
    PoolFull {
        event_id: EventId,
        max_pool_size: usize,
    },
}

impl ReleaseOutcome {
    pub fn is_released(&self) -> bool {
        matches!(self, ReleaseOutcome::Released(_))
    }
}

impl fmt::Display for ReleaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseOutcome::Released(ticket) => {
                write!(f, "released ticket {} for {}", ticket.id(), ticket.event_id())
            }
            ReleaseOutcome::PoolFull {
                event_id,
                max_pool_size,
            } => write!(f, "pool for {} is at capacity {}", event_id, max_pool_size),
        }
    }
}

/// Result of one purchase attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseOutcome {
    Purchased(Ticket),
    PoolEmpty { event_id: EventId },
}

impl PurchaseOutcome {
    pub fn is_purchased(&self) -> bool {
        matches!(self, PurchaseOutcome::Purchased(_))
    }
}

impl fmt::Display for PurchaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseOutcome::Purchased(ticket) => {
                write!(f, "purchased ticket {} for {}", ticket.id(), ticket.event_id())
            }
            PurchaseOutcome::PoolEmpty { event_id } => {
                write!(f, "no tickets available for {}", event_id)
            }
        }
    }
}

/// Releases and purchases tickets, mirrors the result to persistence, and
/// broadcasts what happened.
pub struct TicketService {
    directory: Arc<dyn EventDirectory>,
    persistence: Arc<dyn TicketPersistence>,
    event_tx: broadcast::Sender<SimulationEvent>,
}

impl TicketService {
    pub fn new(
        directory: Arc<dyn EventDirectory>,
        persistence: Arc<dyn TicketPersistence>,
        event_capacity: usize,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));
        Self {
            directory,
            persistence,
            event_tx,
        }
    }

    /// Subscribe to simulation events.
    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.event_tx.subscribe()
    }

    pub(crate) fn emit(&self, event: SimulationEvent) {
        // No receivers is fine.
        let _ = self.event_tx.send(event);
    }

    fn lookup(&self, event_id: &EventId) -> Result<EventItem> {
        self.directory
            .find_event(event_id)
            .ok_or_else(|| RuntimeError::EventNotFound(event_id.clone()))
    }

    /// Attempts to release one ticket from `vendor` into the event's pool.
    pub fn release_tickets(&self, vendor: &Vendor, event_id: &EventId) -> Result<ReleaseOutcome> {
        let event = self.lookup(event_id)?;
        self.release_into(vendor, &event)
    }

    /// Attempts to buy one ticket for `customer` from the event's pool.
    pub fn purchase_ticket(
        &self,
        customer: &Customer,
        event_id: &EventId,
    ) -> Result<PurchaseOutcome> {
        let event = self.lookup(event_id)?;
        self.purchase_from(customer, &event)
    }

    pub(crate) fn release_into(&self, vendor: &Vendor, event: &EventItem) -> Result<ReleaseOutcome> {
        let pool = pool_of(event)?;

        match pool.release(&vendor.id) {
            Ok(ticket) => {
                info!(
                    vendor = %vendor.name,
                    event = %event.name(),
                    ticket = %ticket.id(),
                    available = ?pool.available_count().ok(),
                    "ticket released"
                );
                self.mirror(&ticket, pool);
                self.emit(SimulationEvent::TicketReleased {
                    vendor_id: vendor.id.clone(),
                    event_id: event.id().clone(),
                    ticket_id: ticket.id(),
                });
                Ok(ReleaseOutcome::Released(ticket))
            }
            Err(PoolError::Full {
                event_id,
                max_pool_size,
            }) => {
                info!(vendor = %vendor.name, event = %event.name(), "pool full, release skipped");
                self.emit(SimulationEvent::PoolFull {
                    vendor_id: vendor.id.clone(),
                    event_id: event_id.clone(),
                });
                Ok(ReleaseOutcome::PoolFull {
                    event_id,
                    max_pool_size,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn purchase_from(
        &self,
        customer: &Customer,
        event: &EventItem,
    ) -> Result<PurchaseOutcome> {
        let pool = pool_of(event)?;

        match pool.purchase(&customer.id) {
            Ok(ticket) => {
                info!(
                    customer = %customer.name,
                    event = %event.name(),
                    ticket = %ticket.id(),
                    available = ?pool.available_count().ok(),
                    "ticket purchased"
                );
                self.mirror(&ticket, pool);
                self.emit(SimulationEvent::TicketPurchased {
                    customer_id: customer.id.clone(),
                    event_id: event.id().clone(),
                    ticket_id: ticket.id(),
                });
                Ok(PurchaseOutcome::Purchased(ticket))
            }
            Err(PoolError::Empty { event_id }) => {
                info!(customer = %customer.name, event = %event.name(), "no tickets available");
                self.emit(SimulationEvent::PoolEmpty {
                    customer_id: customer.id.clone(),
                    event_id: event_id.clone(),
                });
                Ok(PurchaseOutcome::PoolEmpty { event_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the changed ticket and the pool state through to persistence.
    /// Failures are logged only; the pool change stands.
    fn mirror(&self, ticket: &Ticket, pool: &TicketPool) {
        if let Err(e) = self.persistence.persist_ticket(ticket) {
            warn!(ticket = %ticket.id(), event_id = %ticket.event_id(), error = %e, "failed to persist ticket");
        }

        match pool.snapshot() {
            Ok(snapshot) => {
                if let Err(e) = self.persistence.persist_pool(&snapshot) {
                    warn!(event_id = %snapshot.event_id, error = %e, "failed to persist pool");
                }
            }
            Err(e) => debug!(event_id = %pool.event_id(), error = %e, "pool snapshot unavailable"),
        }
    }
}

fn pool_of(event: &EventItem) -> Result<&Arc<TicketPool>> {
    event
        .pool()
        .ok_or_else(|| SetupError::MissingPool(event.id().clone()).into())
}
