//! Mirror of pool contents on disk.
//!
//! Writes come from many workers at once and may arrive out of order, so
//! each target path remembers the newest rank it has written. A ticket is
//! ranked by its lifecycle (available, then sold) and a pool snapshot by
//! its version; anything not newer than what is already on disk is skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ticketin_models::EventId;
use ticketin_pool::{PoolSnapshot, Ticket};
use tracing::debug;

use crate::atomic::{read_json_dir, read_json_optional, write_json_atomic};
use crate::error::Result;

const POOLS_DIR: &str = "pools";
const TICKETS_DIR: &str = "tickets";

/// Stores tickets and pool snapshots as JSON.
pub struct TicketStore {
    base_path: PathBuf,
    written: Mutex<HashMap<PathBuf, u64>>,
}

impl TicketStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            written: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn ticket_path(&self, ticket: &Ticket) -> PathBuf {
        self.base_path
            .join(TICKETS_DIR)
            .join(ticket.event_id().as_str())
            .join(format!("{:06}.json", ticket.id().value()))
    }

    fn pool_path(&self, event_id: &EventId) -> PathBuf {
        self.base_path
            .join(POOLS_DIR)
            .join(format!("{}.json", event_id.as_str()))
    }

    /// Writes `value` to `path` unless something of equal or higher rank
    /// was already written there. Returns whether the write happened.
    ///
    /// The rank map lock is held across the write so two writers for the
    /// same path cannot interleave.
    fn write_ranked<T: serde::Serialize>(&self, path: PathBuf, rank: u64, value: &T) -> Result<bool> {
        let mut written = self
            .written
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if written.get(&path).is_some_and(|&seen| seen >= rank) {
            debug!(path = %path.display(), rank, "skipping stale write");
            return Ok(false);
        }

        write_json_atomic(&path, value)?;
        written.insert(path, rank);
        Ok(true)
    }

    /// Saves a ticket record. A sold ticket is never overwritten by its
    /// earlier available state.
    pub fn save_ticket(&self, ticket: &Ticket) -> Result<bool> {
        let rank = if ticket.is_available() { 1 } else { 2 };
        self.write_ranked(self.ticket_path(ticket), rank, ticket)
    }

    /// Lists the stored tickets of an event in id order.
    pub fn list_tickets(&self, event_id: &EventId) -> Result<Vec<Ticket>> {
        let dir = self.base_path.join(TICKETS_DIR).join(event_id.as_str());
        let mut tickets: Vec<Ticket> = read_json_dir(&dir)?;
        tickets.sort_by_key(|t| t.id());
        Ok(tickets)
    }

    /// Saves a pool snapshot if it is newer than the last one written.
    pub fn save_pool(&self, snapshot: &PoolSnapshot) -> Result<bool> {
        self.write_ranked(self.pool_path(&snapshot.event_id), snapshot.version, snapshot)
    }

    /// Loads the stored snapshot for an event, if any.
    pub fn load_pool(&self, event_id: &EventId) -> Result<Option<PoolSnapshot>> {
        read_json_optional(&self.pool_path(event_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use ticketin_models::{CustomerId, VendorId};
    use ticketin_pool::TicketPool;

    #[test]
    fn test_sold_ticket_not_overwritten_by_available() {
        let dir = tempdir().unwrap();
        let store = TicketStore::new(dir.path());
        let pool = TicketPool::new(EventId::new(), 2);

        let released = pool.release(&VendorId::new()).unwrap();
        let sold = pool.purchase(&CustomerId::new()).unwrap();

        assert!(store.save_ticket(&sold).unwrap());
        assert!(!store.save_ticket(&released).unwrap());

        let stored = store.list_tickets(pool.event_id()).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].is_available());
    }

    #[test]
    fn test_list_tickets_in_id_order() {
        let dir = tempdir().unwrap();
        let store = TicketStore::new(dir.path());
        let pool = TicketPool::new(EventId::new(), 5);
        let vendor = VendorId::new();

        let tickets: Vec<_> = (0..3).map(|_| pool.release(&vendor).unwrap()).collect();
        for ticket in tickets.iter().rev() {
            store.save_ticket(ticket).unwrap();
        }

        let ids: Vec<u64> = store
            .list_tickets(pool.event_id())
            .unwrap()
            .iter()
            .map(|t| t.id().value())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_stale_pool_snapshot_skipped() {
        let dir = tempdir().unwrap();
        let store = TicketStore::new(dir.path());
        let pool = TicketPool::new(EventId::new(), 3);
        let vendor = VendorId::new();

        pool.release(&vendor).unwrap();
        let older = pool.snapshot().unwrap();
        pool.release(&vendor).unwrap();
        let newer = pool.snapshot().unwrap();

        assert!(store.save_pool(&newer).unwrap());
        assert!(!store.save_pool(&older).unwrap());

        let loaded = store.load_pool(pool.event_id()).unwrap().unwrap();
        assert_eq!(loaded.version, newer.version);
        assert_eq!(loaded.available_count, 2);
    }

    #[test]
    fn test_load_pool_missing() {
        let dir = tempdir().unwrap();
        let store = TicketStore::new(dir.path());

        assert!(store.load_pool(&EventId::new()).unwrap().is_none());
        assert!(store.list_tickets(&EventId::new()).unwrap().is_empty());
    }

    #[test]
    fn test_saved_pool_restores() {
        let dir = tempdir().unwrap();
        let store = TicketStore::new(dir.path());
        let pool = TicketPool::new(EventId::new(), 4);

        pool.release(&VendorId::new()).unwrap();
        pool.release(&VendorId::new()).unwrap();
        pool.purchase(&CustomerId::new()).unwrap();
        store.save_pool(&pool.snapshot().unwrap()).unwrap();

        let snapshot = store.load_pool(pool.event_id()).unwrap().unwrap();
        let restored = TicketPool::restore(snapshot).unwrap();
        assert_eq!(restored.available_count().unwrap(), 1);
        assert_eq!(restored.sold_count().unwrap(), 1);
    }
}
