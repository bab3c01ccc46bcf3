//! Vendor and customer worker loops.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, trace};

use ticketin_models::{Customer, CustomerId, EventId, Vendor, VendorId};
use ticketin_pool::EventItem;

use crate::error::Result;
use crate::service::TicketService;

/// Identity of a worker: the vendor or customer it acts for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorkerId {
    Vendor(VendorId),
    Customer(CustomerId),
}

impl WorkerId {
    pub fn is_vendor(&self) -> bool {
        matches!(self, WorkerId::Vendor(_))
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerId::Vendor(id) => write!(f, "vendor:{}", id),
            WorkerId::Customer(id) => write!(f, "customer:{}", id),
        }
    }
}

/// What a worker did over its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    pub worker: WorkerId,
    pub event_id: EventId,
    pub attempts: u64,
    pub successes: u64,
}

/// One step of a worker loop.
pub trait WorkerAction: Send + Sync + 'static {
    fn worker_id(&self) -> WorkerId;

    /// Attempts per rate unit.
    fn rate(&self) -> u32;

    /// Makes one attempt against the bound event. Returns whether a ticket
    /// changed hands; capacity outcomes are not errors.
    fn attempt(&self, service: &TicketService, event: &EventItem) -> Result<bool>;
}

/// Releases tickets on behalf of a vendor.
pub struct VendorAction {
    vendor: Vendor,
}

impl VendorAction {
    pub fn new(vendor: Vendor) -> Self {
        Self { vendor }
    }
}

impl WorkerAction for VendorAction {
    fn worker_id(&self) -> WorkerId {
        WorkerId::Vendor(self.vendor.id.clone())
    }

    fn rate(&self) -> u32 {
        self.vendor.release_rate
    }

    fn attempt(&self, service: &TicketService, event: &EventItem) -> Result<bool> {
        Ok(service.release_into(&self.vendor, event)?.is_released())
    }
}

/// Buys tickets on behalf of a customer.
pub struct CustomerAction {
    customer: Customer,
}

impl CustomerAction {
    pub fn new(customer: Customer) -> Self {
        Self { customer }
    }
}

impl WorkerAction for CustomerAction {
    fn worker_id(&self) -> WorkerId {
        WorkerId::Customer(self.customer.id.clone())
    }

    fn rate(&self) -> u32 {
        self.customer.retrieval_rate
    }

    fn attempt(&self, service: &TicketService, event: &EventItem) -> Result<bool> {
        Ok(service.purchase_from(&self.customer, event)?.is_purchased())
    }
}

/// Pause between two attempts of a worker with the given rate.
pub fn rate_interval(rate_unit: Duration, rate: u32) -> Duration {
    rate_unit / rate.max(1)
}

/// A producer or consumer loop bound to one event.
pub struct Worker<A> {
    action: A,
    event: EventItem,
    service: Arc<TicketService>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<A: WorkerAction> Worker<A> {
    pub fn new(
        action: A,
        event: EventItem,
        service: Arc<TicketService>,
        rate_unit: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let interval = rate_interval(rate_unit, action.rate());
        Self {
            action,
            event,
            service,
            interval,
            shutdown,
        }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.action.worker_id()
    }

    pub fn event_id(&self) -> &EventId {
        self.event.id()
    }

    /// Runs until shutdown is signalled.
    ///
    /// The flag is read once per iteration, before the sleep; a signal that
    /// arrives mid-sleep is seen after the following attempt.
    pub async fn run(self) -> Result<WorkerSummary> {
        let mut summary = WorkerSummary {
            worker: self.action.worker_id(),
            event_id: self.event.id().clone(),
            attempts: 0,
            successes: 0,
        };

        debug!(
            worker = %summary.worker,
            event_id = %summary.event_id,
            interval_ms = self.interval.as_millis() as u64,
            "worker loop starting"
        );

        loop {
            if *self.shutdown.borrow() {
                debug!(worker = %summary.worker, "worker received shutdown signal");
                break;
            }

            tokio::time::sleep(self.interval).await;

            summary.attempts += 1;
            if self.action.attempt(&self.service, &self.event)? {
                summary.successes += 1;
            }
            trace!(worker = %summary.worker, attempts = summary.attempts, "attempt done");
        }

        Ok(summary)
    }
}
