//! TicketPool - the bounded shared buffer for one event.
//!
//! Concurrency pattern: a `std::sync::Mutex` around the pool state. Each
//! operation is a short, synchronous critical section with no I/O, so it is
//! safe to call from async tasks without holding the lock across `.await`.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticketin_models::{CustomerId, EventId, VendorId};

use crate::error::{PoolError, Result};
use crate::ticket::{Ticket, TicketId};

/// Internal state of the pool.
struct PoolState {
    /// Every ticket ever released, in release (and therefore id) order.
    tickets: Vec<Ticket>,
    /// Indices into `tickets` of available tickets, lowest id first.
    ///
    /// Its length is the pool's available count.
    available: VecDeque<usize>,
    /// Last ticket number handed out.
    last_id: u64,
    /// Bumped on every successful release or purchase.
    version: u64,
}

/// Consistent view of a pool, taken under its lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub event_id: EventId,
    pub max_pool_size: usize,
    pub available_count: usize,
    pub total_released: usize,
    pub total_sold: usize,
    /// Mutation counter; a higher version is a later state of the same pool.
    pub version: u64,
    pub tickets: Vec<Ticket>,
    pub taken_at: DateTime<Utc>,
}

impl PoolSnapshot {
    /// Returns `total_released == available_count + total_sold`.
    pub fn is_conserved(&self) -> bool {
        self.total_released == self.available_count + self.total_sold
    }

    /// Tickets still for sale.
    pub fn available_tickets(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.iter().filter(|t| t.is_available())
    }
}

/// Bounded ticket buffer owned by one event.
///
/// # Invariants
///
/// - `0 <= available_count <= max_pool_size`
/// - `available_count` equals the number of tickets marked available
/// - a ticket is returned by `purchase` at most once
pub struct TicketPool {
    event_id: EventId,
    max_pool_size: usize,
    state: Mutex<PoolState>,
}

impl TicketPool {
    /// Creates an empty pool.
    pub fn new(event_id: EventId, max_pool_size: usize) -> Self {
        Self {
            event_id,
            max_pool_size,
            state: Mutex::new(PoolState {
                tickets: Vec::new(),
                available: VecDeque::new(),
                last_id: 0,
                version: 0,
            }),
        }
    }

    /// Rebuilds a pool from a persisted snapshot.
    ///
    /// The snapshot is checked against the pool invariants first; ticket ids
    /// must be strictly increasing and all tickets must belong to the
    /// snapshot's event.
    pub fn restore(snapshot: PoolSnapshot) -> Result<Self> {
        let PoolSnapshot {
            event_id,
            max_pool_size,
            version,
            tickets,
            ..
        } = snapshot;

        let mut available = VecDeque::new();
        let mut last_id = 0;
        for (index, ticket) in tickets.iter().enumerate() {
            if ticket.event_id() != &event_id {
                return Err(PoolError::InvalidSnapshot(format!(
                    "ticket {} belongs to {}, not {}",
                    ticket.id(),
                    ticket.event_id(),
                    event_id
                )));
            }
            if ticket.id().value() <= last_id {
                return Err(PoolError::InvalidSnapshot(format!(
                    "ticket ids out of order at {}",
                    ticket.id()
                )));
            }
            last_id = ticket.id().value();
            if ticket.is_available() {
                available.push_back(index);
            }
        }

        if available.len() > max_pool_size {
            return Err(PoolError::InvalidSnapshot(format!(
                "{} available tickets exceed capacity {}",
                available.len(),
                max_pool_size
            )));
        }

        Ok(Self {
            event_id,
            max_pool_size,
            state: Mutex::new(PoolState {
                tickets,
                available,
                last_id,
                version,
            }),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, PoolState>> {
        self.state
            .lock()
            .map_err(|e| PoolError::LockPoisoned(e.to_string()))
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn max_pool_size(&self) -> usize {
        self.max_pool_size
    }

    /// Adds one available ticket released by `vendor`.
    ///
    /// Fails with [`PoolError::Full`] when the available count is already at
    /// `max_pool_size`. The capacity check and the append happen under one
    /// lock acquisition.
    pub fn release(&self, vendor: &VendorId) -> Result<Ticket> {
        let mut state = self.lock()?;

        if state.available.len() >= self.max_pool_size {
            return Err(PoolError::Full {
                event_id: self.event_id.clone(),
                max_pool_size: self.max_pool_size,
            });
        }

        state.last_id += 1;
        let ticket = Ticket::new(
            TicketId::new(state.last_id),
            self.event_id.clone(),
            vendor.clone(),
        );

        let index = state.tickets.len();
        state.tickets.push(ticket.clone());
        state.available.push_back(index);
        state.version += 1;

        Ok(ticket)
    }

    /// Sells the lowest-id available ticket to `customer`.
    ///
    /// Fails with [`PoolError::Empty`] when nothing is available. Selection
    /// and the sold transition happen under one lock acquisition, so no
    /// ticket is ever returned to two callers.
    pub fn purchase(&self, customer: &CustomerId) -> Result<Ticket> {
        let mut state = self.lock()?;

        let Some(index) = state.available.pop_front() else {
            return Err(PoolError::Empty {
                event_id: self.event_id.clone(),
            });
        };

        let ticket = {
            let ticket = &mut state.tickets[index];
            ticket.mark_sold(customer);
            ticket.clone()
        };
        state.version += 1;

        Ok(ticket)
    }

    /// Returns a consistent view of the pool.
    pub fn snapshot(&self) -> Result<PoolSnapshot> {
        let state = self.lock()?;
        let total_released = state.tickets.len();
        let available_count = state.available.len();

        Ok(PoolSnapshot {
            event_id: self.event_id.clone(),
            max_pool_size: self.max_pool_size,
            available_count,
            total_released,
            total_sold: total_released - available_count,
            version: state.version,
            tickets: state.tickets.clone(),
            taken_at: Utc::now(),
        })
    }

    /// Number of tickets currently for sale.
    pub fn available_count(&self) -> Result<usize> {
        Ok(self.lock()?.available.len())
    }

    /// Number of tickets sold so far.
    pub fn sold_count(&self) -> Result<usize> {
        let state = self.lock()?;
        Ok(state.tickets.len() - state.available.len())
    }
}

impl std::fmt::Debug for TicketPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketPool")
            .field("event_id", &self.event_id)
            .field("max_pool_size", &self.max_pool_size)
            .field("available_count", &self.available_count().ok())
            .finish()
    }
}
