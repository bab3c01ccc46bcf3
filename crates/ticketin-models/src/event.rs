//! Event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, VendorId};

/// Descriptive data for an event.
///
/// The ticket pool itself is attached by `ticketin_pool::EventItem`; this
/// is the part that is stored with the rest of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    pub id: EventId,
    pub name: String,

    /// Vendor that owns the event.
    pub vendor_id: VendorId,

    /// Cap on available tickets, fixed at creation.
    pub max_pool_size: usize,

    #[serde(default)]
    pub simulated: bool,

    pub created_at: DateTime<Utc>,
}

impl EventInfo {
    /// Creates a new event owned by `vendor_id`.
    pub fn new(name: impl Into<String>, vendor_id: VendorId, max_pool_size: usize) -> Self {
        Self {
            id: EventId::new(),
            name: name.into(),
            vendor_id,
            max_pool_size,
            simulated: false,
            created_at: Utc::now(),
        }
    }

    pub fn simulated(mut self) -> Self {
        self.simulated = true;
        self
    }

    /// Returns true if `key` is this event's id or name.
    pub fn matches(&self, key: &str) -> bool {
        self.id.as_str() == key || self.name == key
    }

    pub fn is_owned_by(&self, vendor_id: &VendorId) -> bool {
        &self.vendor_id == vendor_id
    }
}
