//! Batch lifecycle: spawn one worker per vendor and customer, stop them all.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use ticketin_models::{Customer, Vendor};
use ticketin_pool::EventItem;

use crate::config::SimulationConfig;
use crate::error::{Result, RuntimeError, SetupError};
use crate::event::SimulationEvent;
use crate::service::TicketService;
use crate::worker::{CustomerAction, VendorAction, Worker, WorkerAction, WorkerId, WorkerSummary};

/// A worker that ended on a panic or an unexpected error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFault {
    pub worker: WorkerId,
    pub reason: String,
}

/// What a finished batch did.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    /// Workers that exited cleanly.
    pub summaries: Vec<WorkerSummary>,
    pub faults: Vec<WorkerFault>,
}

impl BatchReport {
    pub fn tickets_released(&self) -> u64 {
        self.summaries
            .iter()
            .filter(|s| s.worker.is_vendor())
            .map(|s| s.successes)
            .sum()
    }

    pub fn tickets_purchased(&self) -> u64 {
        self.summaries
            .iter()
            .filter(|s| !s.worker.is_vendor())
            .map(|s| s.successes)
            .sum()
    }
}

/// Counts one live worker for as long as it exists.
struct ActiveWorker {
    counter: Arc<AtomicUsize>,
}

impl ActiveWorker {
    fn acquire(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for ActiveWorker {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

type WorkerExit = std::result::Result<WorkerSummary, WorkerFault>;

/// A running batch.
pub struct SimulationHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(WorkerId, JoinHandle<WorkerExit>)>,
    active: Arc<AtomicUsize>,
    join_timeout: std::time::Duration,
    started_at: DateTime<Utc>,
    /// Set by the first `stop`.
    outcome: Option<Result<BatchReport>>,
}

impl SimulationHandle {
    /// Number of workers whose task has not ended yet.
    pub fn active_worker_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.outcome.is_some()
    }

    /// Signals shutdown and waits for every worker.
    ///
    /// All joins share one deadline of `join_timeout`; workers still running
    /// then are aborted, joined, and reported as `RuntimeError::Stragglers`
    /// along with the report of everyone else. Calling `stop` again returns
    /// the first outcome without doing anything else.
    pub async fn stop(&mut self) -> Result<BatchReport> {
        if let Some(outcome) = &self.outcome {
            return outcome.clone();
        }

        info!(workers = self.tasks.len(), "stopping simulation");
        // Workers hold receivers until they exit, so a send error only means
        // every worker is already gone.
        let _ = self.shutdown_tx.send(true);

        let deadline = Instant::now() + self.join_timeout;
        let mut summaries = Vec::new();
        let mut faults = Vec::new();
        let mut stragglers = Vec::new();

        for (worker, mut handle) in self.tasks.drain(..) {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(Ok(summary))) => summaries.push(summary),
                Ok(Ok(Err(fault))) => faults.push(fault),
                Ok(Err(join_error)) => faults.push(WorkerFault {
                    worker,
                    reason: join_error.to_string(),
                }),
                Err(_) => {
                    warn!(worker = %worker, "worker did not stop in time, aborting");
                    handle.abort();
                    // The guard drops once the cancelled task is joined.
                    let _ = handle.await;
                    stragglers.push(worker);
                }
            }
        }

        let report = BatchReport {
            started_at: self.started_at,
            stopped_at: Utc::now(),
            summaries,
            faults,
        };
        info!(
            released = report.tickets_released(),
            purchased = report.tickets_purchased(),
            faults = report.faults.len(),
            stragglers = stragglers.len(),
            "simulation stopped"
        );

        let outcome = if stragglers.is_empty() {
            Ok(report)
        } else {
            Err(RuntimeError::Stragglers {
                workers: stragglers,
                report: Box::new(report),
            })
        };

        self.outcome = Some(outcome.clone());
        outcome
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        if self.outcome.is_none() {
            let _ = self.shutdown_tx.send(true);
        }
    }
}

/// Starts and stops simulation batches over a shared ticket service.
pub struct SimulationController {
    service: Arc<TicketService>,
    config: SimulationConfig,
    active: Arc<AtomicUsize>,
    current: Mutex<Option<SimulationHandle>>,
}

impl SimulationController {
    pub fn new(service: Arc<TicketService>, config: SimulationConfig) -> Self {
        Self {
            service,
            config,
            active: Arc::new(AtomicUsize::new(0)),
            current: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn service(&self) -> Arc<TicketService> {
        Arc::clone(&self.service)
    }

    /// Subscribe to simulation events.
    pub fn subscribe(&self) -> broadcast::Receiver<SimulationEvent> {
        self.service.subscribe()
    }

    /// Live workers across all batches started by this controller.
    pub fn active_worker_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Spawns one worker per vendor and per customer.
    ///
    /// A vendor works the first event it owns, or an event picked round-robin
    /// if it owns none of them. Customers are spread round-robin. Every
    /// worker is counted as active before this returns.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        &self,
        vendors: &[Vendor],
        customers: &[Customer],
        events: &[EventItem],
    ) -> Result<SimulationHandle> {
        validate(vendors, customers, events)?;
        if self.config.rate_unit >= self.config.join_timeout {
            warn!(
                rate_unit = ?self.config.rate_unit,
                join_timeout = ?self.config.join_timeout,
                "join timeout is shorter than a rate-1 interval, slow workers will be aborted on stop"
            );
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = Vec::with_capacity(vendors.len() + customers.len());

        for (i, vendor) in vendors.iter().enumerate() {
            let event = events
                .iter()
                .find(|e| e.info.is_owned_by(&vendor.id))
                .unwrap_or(&events[i % events.len()]);
            tasks.push(self.spawn_worker(
                VendorAction::new(vendor.clone()),
                event.clone(),
                shutdown_rx.clone(),
            ));
        }

        for (i, customer) in customers.iter().enumerate() {
            let event = &events[i % events.len()];
            tasks.push(self.spawn_worker(
                CustomerAction::new(customer.clone()),
                event.clone(),
                shutdown_rx.clone(),
            ));
        }

        info!(
            vendors = vendors.len(),
            customers = customers.len(),
            events = events.len(),
            "simulation started"
        );

        Ok(SimulationHandle {
            shutdown_tx,
            tasks,
            active: Arc::clone(&self.active),
            join_timeout: self.config.join_timeout,
            started_at: Utc::now(),
            outcome: None,
        })
    }

    fn spawn_worker<A: WorkerAction>(
        &self,
        action: A,
        event: EventItem,
        shutdown: watch::Receiver<bool>,
    ) -> (WorkerId, JoinHandle<WorkerExit>) {
        let worker = Worker::new(
            action,
            event,
            Arc::clone(&self.service),
            self.config.rate_unit,
            shutdown,
        );
        let worker_id = worker.worker_id();
        let service = Arc::clone(&self.service);
        let guard = ActiveWorker::acquire(Arc::clone(&self.active));

        let id = worker_id.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            service.emit(SimulationEvent::WorkerStarted {
                worker: id.clone(),
                event_id: worker.event_id().clone(),
            });

            let fault_reason = match AssertUnwindSafe(worker.run()).catch_unwind().await {
                Ok(Ok(summary)) => {
                    debug!(worker = %id, attempts = summary.attempts, "worker stopped");
                    service.emit(SimulationEvent::WorkerStopped {
                        worker: id,
                        attempts: summary.attempts,
                        successes: summary.successes,
                    });
                    return Ok(summary);
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };

            error!(worker = %id, reason = %fault_reason, "worker faulted");
            service.emit(SimulationEvent::WorkerFaulted {
                worker: id.clone(),
                reason: fault_reason.clone(),
            });
            Err(WorkerFault {
                worker: id,
                reason: fault_reason,
            })
        });

        (worker_id, handle)
    }

    /// Starts a batch unless one is already running.
    pub async fn start_simulation(
        &self,
        vendors: &[Vendor],
        customers: &[Customer],
        events: &[EventItem],
    ) -> Result<()> {
        let mut current = self.current.lock().await;
        if current.is_some() {
            return Err(RuntimeError::AlreadyRunning);
        }
        *current = Some(self.start(vendors, customers, events)?);
        Ok(())
    }

    /// Stops the running batch. Returns `Ok(None)` if nothing was running.
    ///
    /// The batch slot stays locked until every worker has been joined, so a
    /// concurrent `start_simulation` waits and then starts on an idle
    /// controller.
    pub async fn stop_simulation(&self) -> Result<Option<BatchReport>> {
        let mut current = self.current.lock().await;
        let outcome = match current.as_mut() {
            Some(handle) => handle.stop().await.map(Some),
            None => return Ok(None),
        };
        *current = None;
        outcome
    }

    pub async fn is_running(&self) -> bool {
        self.current.lock().await.is_some()
    }
}

fn validate(vendors: &[Vendor], customers: &[Customer], events: &[EventItem]) -> Result<()> {
    if vendors.is_empty() {
        return Err(SetupError::NoVendors.into());
    }
    if customers.is_empty() {
        return Err(SetupError::NoCustomers.into());
    }
    if events.is_empty() {
        return Err(SetupError::NoEvents.into());
    }

    let rates = vendors
        .iter()
        .map(|v| (format!("vendor {}", v.name), v.release_rate))
        .chain(
            customers
                .iter()
                .map(|c| (format!("customer {}", c.name), c.retrieval_rate)),
        );
    for (who, rate) in rates {
        if rate == 0 {
            return Err(SetupError::InvalidRate { who, rate }.into());
        }
    }

    if let Some(event) = events.iter().find(|e| !e.has_pool()) {
        return Err(SetupError::MissingPool(event.id().clone()).into());
    }

    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
