//! In-memory event catalog.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use ticketin_models::EventId;
use ticketin_pool::EventItem;

use crate::traits::EventDirectory;

/// Events keyed by id. Pools are `Arc`-shared, so items handed out by the
/// catalog operate on the same tickets as the catalog itself.
#[derive(Debug, Default)]
pub struct EventCatalog {
    events: RwLock<HashMap<EventId, EventItem>>,
}

impl EventCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    // The map holds no invariants spanning entries, so a poisoned guard is
    // still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<EventId, EventItem>> {
        self.events.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<EventId, EventItem>> {
        self.events.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds or replaces an event.
    pub fn insert(&self, event: EventItem) {
        self.write().insert(event.id().clone(), event);
    }

    pub fn get(&self, id: &EventId) -> Option<EventItem> {
        self.read().get(id).cloned()
    }

    /// Finds an event by id or name.
    pub fn find(&self, key: &str) -> Option<EventItem> {
        self.read().values().find(|e| e.info.matches(key)).cloned()
    }

    /// All events, oldest first.
    pub fn list(&self) -> Vec<EventItem> {
        let mut events: Vec<EventItem> = self.read().values().cloned().collect();
        events.sort_by_key(|e| e.info.created_at);
        events
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl EventDirectory for EventCatalog {
    fn find_event(&self, id: &EventId) -> Option<EventItem> {
        self.get(id)
    }
}
