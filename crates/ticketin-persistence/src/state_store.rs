//! State store for catalog records (vendors, customers, events).

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use ticketin_models::{Customer, EventInfo, Vendor};

use crate::atomic::{read_json_dir, write_json_atomic};
use crate::error::Result;

const VENDORS_DIR: &str = "vendors";
const CUSTOMERS_DIR: &str = "customers";
const EVENTS_DIR: &str = "events";

/// Manages persistence of catalog records, one JSON file per record.
pub struct StateStore {
    base_path: PathBuf,
}

impl StateStore {
    /// Creates a new StateStore with the given base path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }

    fn record_path(&self, kind: &str, id: &str) -> PathBuf {
        self.base_path.join(kind).join(format!("{}.json", id))
    }

    fn load_sorted<T, K>(&self, kind: &str, key: impl Fn(&T) -> K) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        K: Ord,
    {
        let mut records: Vec<T> = read_json_dir(&self.base_path.join(kind))?;
        records.sort_by_key(|r| key(r));
        Ok(records)
    }

    fn save<T: Serialize>(&self, kind: &str, id: &str, record: &T) -> Result<()> {
        write_json_atomic(&self.record_path(kind, id), record)
    }

    pub fn save_vendor(&self, vendor: &Vendor) -> Result<()> {
        self.save(VENDORS_DIR, vendor.id.as_str(), vendor)
    }

    /// Loads all vendors, oldest first.
    pub fn load_vendors(&self) -> Result<Vec<Vendor>> {
        self.load_sorted(VENDORS_DIR, |v: &Vendor| v.created_at)
    }

    pub fn save_customer(&self, customer: &Customer) -> Result<()> {
        self.save(CUSTOMERS_DIR, customer.id.as_str(), customer)
    }

    /// Loads all customers, oldest first.
    pub fn load_customers(&self) -> Result<Vec<Customer>> {
        self.load_sorted(CUSTOMERS_DIR, |c: &Customer| c.created_at)
    }

    pub fn save_event(&self, event: &EventInfo) -> Result<()> {
        self.save(EVENTS_DIR, event.id.as_str(), event)
    }

    /// Loads all events, oldest first.
    pub fn load_events(&self) -> Result<Vec<EventInfo>> {
        self.load_sorted(EVENTS_DIR, |e: &EventInfo| e.created_at)
    }
}
