//! Tickets held by a pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use ticketin_models::{CustomerId, EventId, VendorId};

/// Per-pool ticket number. The first ticket released into a pool is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(u64);

impl TicketId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A ticket for one event.
///
/// Tickets start out available and become sold exactly once. Only the owning
/// [`TicketPool`](crate::TicketPool) can perform that transition, so the
/// fields are private and exposed through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    id: TicketId,
    event_id: EventId,
    available: bool,
    released_by: VendorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    sold_to: Option<CustomerId>,
    released_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sold_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub(crate) fn new(id: TicketId, event_id: EventId, released_by: VendorId) -> Self {
        Self {
            id,
            event_id,
            available: true,
            released_by,
            sold_to: None,
            released_at: Utc::now(),
            sold_at: None,
        }
    }

    /// Transitions the ticket to sold. Callers must hold the pool lock and
    /// must only pass tickets taken from the available queue.
    pub(crate) fn mark_sold(&mut self, customer: &CustomerId) {
        debug_assert!(self.available, "ticket {} sold twice", self.id);
        self.available = false;
        self.sold_to = Some(customer.clone());
        self.sold_at = Some(Utc::now());
    }

    pub fn id(&self) -> TicketId {
        self.id
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Vendor whose release created this ticket.
    pub fn released_by(&self) -> &VendorId {
        &self.released_by
    }

    /// Customer who bought the ticket, once sold.
    pub fn sold_to(&self) -> Option<&CustomerId> {
        self.sold_to.as_ref()
    }

    pub fn released_at(&self) -> DateTime<Utc> {
        self.released_at
    }

    pub fn sold_at(&self) -> Option<DateTime<Utc>> {
        self.sold_at
    }
}
