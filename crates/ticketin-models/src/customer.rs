//! Customer records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::CustomerId;

/// A customer that buys tickets from event pools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub contact: String,

    /// Purchase attempts per rate unit.
    pub retrieval_rate: u32,

    #[serde(default)]
    pub simulated: bool,

    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a new customer.
    pub fn new(name: impl Into<String>, contact: impl Into<String>, retrieval_rate: u32) -> Self {
        Self {
            id: CustomerId::new(),
            name: name.into(),
            contact: contact.into(),
            retrieval_rate,
            simulated: false,
            created_at: Utc::now(),
        }
    }

    /// Marks the customer as part of the simulated population.
    pub fn simulated(mut self) -> Self {
        self.simulated = true;
        self
    }

    /// Returns true if `key` is this customer's id or name.
    pub fn matches(&self, key: &str) -> bool {
        self.id.as_str() == key || self.name == key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_roundtrip_defaults_simulated() {
        let customer = Customer::new("Ada", "ada@example.com", 2);
        let mut json: serde_json::Value = serde_json::to_value(&customer).unwrap();
        json.as_object_mut().unwrap().remove("simulated");

        let parsed: Customer = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.id, customer.id);
        assert!(!parsed.simulated);
    }
}
