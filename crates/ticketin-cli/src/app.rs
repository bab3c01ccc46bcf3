//! Application state shared by the REPL and the headless commands.

use std::path::Path;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, warn};

use ticketin_models::{Customer, EventInfo, Vendor};
use ticketin_persistence::{StateStore, TicketStore};
use ticketin_pool::{EventItem, PoolSnapshot, TicketPool};
use ticketin_runtime::{
    BatchReport, EventCatalog, SimulationConfig, SimulationController, TicketService,
};

use crate::commands::Result;

/// Highest rate handed to generated vendors and customers.
const MAX_SIMULATED_RATE: u32 = 5;
/// Largest pool handed to generated events.
const MAX_SIMULATED_POOL: usize = 10;

/// Counts of records created by `App::configure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configured {
    pub vendors: usize,
    pub customers: usize,
    pub events: usize,
}

/// Records that take part in a simulation batch.
#[derive(Debug, Clone)]
pub struct Population {
    pub vendors: Vec<Vendor>,
    pub customers: Vec<Customer>,
    pub events: Vec<EventItem>,
}

/// Vendors, customers, events and the simulation controller.
pub struct App {
    store: StateStore,
    catalog: Arc<EventCatalog>,
    controller: SimulationController,
    vendors: Vec<Vendor>,
    customers: Vec<Customer>,
}

impl App {
    /// Loads saved records from `state_dir` and rebuilds each event's pool
    /// from its last stored snapshot.
    pub fn open(state_dir: &Path, config: SimulationConfig) -> Result<Self> {
        let store = StateStore::new(state_dir);
        let tickets = Arc::new(TicketStore::new(state_dir));
        let catalog = Arc::new(EventCatalog::new());

        let vendors = store.load_vendors()?;
        let customers = store.load_customers()?;
        for info in store.load_events()? {
            catalog.insert(restore_event(&tickets, info));
        }

        let service = Arc::new(TicketService::new(
            catalog.clone(),
            tickets.clone(),
            config.event_capacity,
        ));
        let controller = SimulationController::new(service, config);

        info!(
            vendors = vendors.len(),
            customers = customers.len(),
            events = catalog.len(),
            "state loaded"
        );

        Ok(Self {
            store,
            catalog,
            controller,
            vendors,
            customers,
        })
    }

    pub fn vendors(&self) -> &[Vendor] {
        &self.vendors
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn events(&self) -> Vec<EventItem> {
        self.catalog.list()
    }

    pub fn controller(&self) -> &SimulationController {
        &self.controller
    }

    pub fn find_vendor(&self, key: &str) -> Result<&Vendor> {
        self.vendors
            .iter()
            .find(|v| v.matches(key))
            .ok_or_else(|| format!("Vendor not found: {}", key).into())
    }

    pub fn find_customer(&self, key: &str) -> Result<&Customer> {
        self.customers
            .iter()
            .find(|c| c.matches(key))
            .ok_or_else(|| format!("Customer not found: {}", key).into())
    }

    pub fn find_event(&self, key: &str) -> Result<EventItem> {
        self.catalog
            .find(key)
            .ok_or_else(|| format!("Event not found: {}", key).into())
    }

    pub fn add_vendor(&mut self, name: &str, release_rate: u32) -> Result<&Vendor> {
        check_rate(release_rate)?;
        self.insert_vendor(Vendor::new(name, contact_for(name), release_rate))
    }

    fn insert_vendor(&mut self, vendor: Vendor) -> Result<&Vendor> {
        self.store.save_vendor(&vendor)?;
        info!(vendor_id = %vendor.id, name = %vendor.name, "vendor created");
        self.vendors.push(vendor);
        Ok(&self.vendors[self.vendors.len() - 1])
    }

    pub fn add_customer(&mut self, name: &str, retrieval_rate: u32) -> Result<&Customer> {
        check_rate(retrieval_rate)?;
        self.insert_customer(Customer::new(name, contact_for(name), retrieval_rate))
    }

    fn insert_customer(&mut self, customer: Customer) -> Result<&Customer> {
        self.store.save_customer(&customer)?;
        info!(customer_id = %customer.id, name = %customer.name, "customer created");
        self.customers.push(customer);
        Ok(&self.customers[self.customers.len() - 1])
    }

    /// Creates an event owned by the given vendor, with an empty pool.
    pub fn add_event(&mut self, vendor_key: &str, name: &str, max_pool_size: usize) -> Result<EventItem> {
        let vendor_id = self.find_vendor(vendor_key)?.id.clone();
        self.insert_event(EventInfo::new(name, vendor_id, max_pool_size))
    }

    fn insert_event(&mut self, info: EventInfo) -> Result<EventItem> {
        self.store.save_event(&info)?;
        info!(event_id = %info.id, name = %info.name, max_pool_size = info.max_pool_size, "event created");
        let event = EventItem::with_pool(info);
        self.catalog.insert(event.clone());
        Ok(event)
    }

    /// Generates simulated vendors and customers with random rates, and one
    /// event per vendor owned by a randomly chosen generated vendor.
    pub fn configure(&mut self, vendors: usize, customers: usize) -> Result<Configured> {
        let mut rng = rand::thread_rng();
        let mut created = Vec::with_capacity(vendors);

        for i in 1..=vendors {
            let name = format!("sim-vendor-{}", i);
            let rate = rng.gen_range(1..=MAX_SIMULATED_RATE);
            let vendor = Vendor::new(name.as_str(), contact_for(&name), rate).simulated();
            created.push(self.insert_vendor(vendor)?.id.clone());
        }

        for i in 1..=customers {
            let name = format!("sim-customer-{}", i);
            let rate = rng.gen_range(1..=MAX_SIMULATED_RATE);
            self.insert_customer(Customer::new(name.as_str(), contact_for(&name), rate).simulated())?;
        }

        for i in 1..=vendors {
            let Some(owner) = created.choose(&mut rng).cloned() else {
                break;
            };
            let size = rng.gen_range(1..=MAX_SIMULATED_POOL);
            self.insert_event(EventInfo::new(format!("sim-event-{}", i), owner, size).simulated())?;
        }

        Ok(Configured {
            vendors,
            customers,
            events: vendors,
        })
    }

    /// Makes one release attempt and returns the status line.
    ///
    /// Only the event's owner may release into it by hand.
    pub fn release(&self, vendor_key: &str, event_key: &str) -> Result<String> {
        let vendor = self.find_vendor(vendor_key)?;
        let event = self.find_event(event_key)?;
        if !event.info.is_owned_by(&vendor.id) {
            return Err(format!("{} does not own {}", vendor.name, event.name()).into());
        }

        let outcome = self
            .controller
            .service()
            .release_tickets(vendor, event.id())?;
        Ok(format!("{}: {}", vendor.name, outcome))
    }

    /// Makes one purchase attempt and returns the status line.
    pub fn buy(&self, customer_key: &str, event_key: &str) -> Result<String> {
        let customer = self.find_customer(customer_key)?;
        let event = self.find_event(event_key)?;

        let outcome = self
            .controller
            .service()
            .purchase_ticket(customer, event.id())?;
        Ok(format!("{}: {}", customer.name, outcome))
    }

    pub fn pool_snapshot(&self, event_key: &str) -> Result<PoolSnapshot> {
        let event = self.find_event(event_key)?;
        let pool = event
            .pool()
            .ok_or_else(|| format!("{} has no ticket pool", event.name()))?;
        Ok(pool.snapshot()?)
    }

    /// The generated vendors, customers and events that a batch runs over.
    ///
    /// Records added by hand are left out; they only move tickets through
    /// `release` and `buy`.
    pub fn population(&self) -> Population {
        Population {
            vendors: self.vendors.iter().filter(|v| v.simulated).cloned().collect(),
            customers: self.customers.iter().filter(|c| c.simulated).cloned().collect(),
            events: self
                .catalog
                .list()
                .into_iter()
                .filter(|e| e.info.simulated)
                .collect(),
        }
    }

    /// Starts a batch over the generated population.
    pub async fn start(&self) -> Result<()> {
        let population = self.population();
        self.controller
            .start_simulation(&population.vendors, &population.customers, &population.events)
            .await?;
        Ok(())
    }

    pub async fn stop(&self) -> Result<Option<BatchReport>> {
        Ok(self.controller.stop_simulation().await?)
    }
}

fn check_rate(rate: u32) -> Result<()> {
    if rate == 0 {
        return Err("rate must be at least 1".into());
    }
    Ok(())
}

/// Builds a throwaway contact address from a display name.
fn contact_for(name: &str) -> String {
    let local: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    format!("{}{}@example.com", local, rand::thread_rng().gen_range(0..1000))
}

fn restore_event(tickets: &TicketStore, info: EventInfo) -> EventItem {
    let snapshot = match tickets.load_pool(&info.id) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(event_id = %info.id, error = %e, "could not read stored pool, starting empty");
            None
        }
    };

    let Some(snapshot) = snapshot else {
        return EventItem::with_pool(info);
    };

    let mut event = EventItem::new(info);
    match TicketPool::restore(snapshot) {
        Ok(pool) => {
            if event.attach_pool(pool).is_err() {
                warn!(event_id = %event.id(), "stored pool belongs to another event, starting empty");
            }
        }
        Err(e) => warn!(event_id = %event.id(), error = %e, "stored pool rejected, starting empty"),
    }
    event.create_ticket_pool();
    event
}
