//! Vendor records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::VendorId;

/// A vendor that releases tickets into event pools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    /// Unique identifier for the vendor.
    pub id: VendorId,

    /// Display name.
    pub name: String,

    /// Contact address.
    pub contact: String,

    /// Tickets the vendor attempts to release per rate unit.
    pub release_rate: u32,

    /// Whether the vendor was generated for a simulation run.
    #[serde(default)]
    pub simulated: bool,

    /// When the vendor was created.
    pub created_at: DateTime<Utc>,
}

impl Vendor {
    /// Creates a new vendor.
    pub fn new(name: impl Into<String>, contact: impl Into<String>, release_rate: u32) -> Self {
        Self {
            id: VendorId::new(),
            name: name.into(),
            contact: contact.into(),
            release_rate,
            simulated: false,
            created_at: Utc::now(),
        }
    }

    /// Marks the vendor as part of the simulated population.
    pub fn simulated(mut self) -> Self {
        self.simulated = true;
        self
    }

    /// Returns true if `key` is this vendor's id or name.
    pub fn matches(&self, key: &str) -> bool {
        self.id.as_str() == key || self.name == key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_new() {
        let vendor = Vendor::new("Acme", "acme@example.com", 3);
        assert_eq!(vendor.release_rate, 3);
        assert!(!vendor.simulated);
        assert!(vendor.simulated().simulated);
    }

    #[test]
    fn test_vendor_matches_id_or_name() {
        let vendor = Vendor::new("Acme", "acme@example.com", 1);
        assert!(vendor.matches("Acme"));
        assert!(vendor.matches(vendor.id.as_str()));
        assert!(!vendor.matches("acme"));
    }
}
