//! Simulation runtime for TicketIn.
//!
//! This crate runs vendors and customers against per-event ticket pools:
//! - `TicketService` - single release/purchase attempts, persistence mirroring
//! - `Worker` - a rate-paced loop around one `WorkerAction`
//! - `SimulationController` - starts and stops batches of workers
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ticketin_runtime::{EventCatalog, NoopPersistence, SimulationConfig,
//!     SimulationController, TicketService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SimulationConfig::default();
//!     let catalog = Arc::new(EventCatalog::new());
//!     let service = Arc::new(TicketService::new(
//!         catalog.clone(),
//!         Arc::new(NoopPersistence),
//!         config.event_capacity,
//!     ));
//!     let controller = SimulationController::new(service, config);
//!
//!     controller.start_simulation(&vendors, &customers, &catalog.list()).await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!     if let Some(report) = controller.stop_simulation().await? {
//!         println!("released {}", report.tickets_released());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Key Concepts
//!
//! ## Workers
//!
//! Every vendor and customer gets its own Tokio task. A worker checks the
//! shutdown flag, sleeps `rate_unit / rate`, then makes one attempt. A full
//! or empty pool is an ordinary outcome and the loop carries on.
//!
//! ## Shutdown
//!
//! A batch shares one `watch` channel. `SimulationHandle::stop` flips it and
//! joins all workers under a single deadline, aborting any that overrun.
//!
//! ## Faults
//!
//! Each worker runs under `catch_unwind`. A panic or unexpected pool error
//! ends that worker only and is listed in the batch report.

pub mod catalog;
pub mod config;
pub mod error;
pub mod event;
pub mod service;
pub mod simulation;
pub mod traits;
pub mod worker;

pub use catalog::EventCatalog;
pub use config::SimulationConfig;
pub use error::{Result, RuntimeError, SetupError};
pub use event::SimulationEvent;
pub use service::{PurchaseOutcome, ReleaseOutcome, TicketService};
pub use simulation::{BatchReport, SimulationController, SimulationHandle, WorkerFault};
pub use traits::{EventDirectory, NoopPersistence, TicketPersistence};
pub use worker::{
    rate_interval, CustomerAction, VendorAction, Worker, WorkerAction, WorkerId, WorkerSummary,
};
