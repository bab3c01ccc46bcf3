//! Events and the pool they own.

use std::sync::Arc;

use ticketin_models::{EventId, EventInfo};

use crate::pool::TicketPool;

/// An event together with its ticket pool.
///
/// Cloning an `EventItem` shares the pool; every clone observes and mutates
/// the same tickets. An event without a pool is valid catalog data but
/// cannot take part in a simulation.
#[derive(Debug, Clone)]
pub struct EventItem {
    pub info: EventInfo,
    pool: Option<Arc<TicketPool>>,
}

impl EventItem {
    /// Wraps event info without creating a pool.
    pub fn new(info: EventInfo) -> Self {
        Self { info, pool: None }
    }

    /// Wraps event info and creates an empty pool sized by `max_pool_size`.
    pub fn with_pool(info: EventInfo) -> Self {
        let mut event = Self::new(info);
        event.create_ticket_pool();
        event
    }

    /// Attaches a pool built elsewhere, e.g. restored from disk.
    ///
    /// Returns the pool back if it belongs to a different event.
    pub fn attach_pool(&mut self, pool: TicketPool) -> Result<(), TicketPool> {
        if pool.event_id() != &self.info.id {
            return Err(pool);
        }
        self.pool = Some(Arc::new(pool));
        Ok(())
    }

    /// Creates the event's pool if it does not exist yet.
    pub fn create_ticket_pool(&mut self) -> Arc<TicketPool> {
        let info = &self.info;
        let pool = self
            .pool
            .get_or_insert_with(|| Arc::new(TicketPool::new(info.id.clone(), info.max_pool_size)));
        Arc::clone(pool)
    }

    pub fn id(&self) -> &EventId {
        &self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn pool(&self) -> Option<&Arc<TicketPool>> {
        self.pool.as_ref()
    }

    pub fn has_pool(&self) -> bool {
        self.pool.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketin_models::VendorId;

    #[test]
    fn test_new_event_has_no_pool() {
        let event = EventItem::new(EventInfo::new("Expo", VendorId::new(), 5));
        assert!(!event.has_pool());
    }

    #[test]
    fn test_create_ticket_pool_is_idempotent() {
        let mut event = EventItem::new(EventInfo::new("Expo", VendorId::new(), 5));
        let first = event.create_ticket_pool();
        let second = event.create_ticket_pool();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.max_pool_size(), 5);
    }

    #[test]
    fn test_clones_share_pool() {
        let vendor = VendorId::new();
        let event = EventItem::with_pool(EventInfo::new("Expo", vendor.clone(), 5));
        let clone = event.clone();

        clone.pool().unwrap().release(&vendor).unwrap();
        assert_eq!(event.pool().unwrap().available_count().unwrap(), 1);
    }

    #[test]
    fn test_attach_pool_rejects_foreign_pool() {
        let mut event = EventItem::new(EventInfo::new("Expo", VendorId::new(), 5));
        let foreign = TicketPool::new(EventId::new(), 5);

        assert!(event.attach_pool(foreign).is_err());
        assert!(!event.has_pool());

        let own = TicketPool::new(event.id().clone(), 5);
        assert!(event.attach_pool(own).is_ok());
        assert!(event.has_pool());
    }
}
