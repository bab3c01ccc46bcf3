//! Persistence layer for TicketIn.
//!
//! Everything is stored as JSON under one base directory and written with
//! temp-file-then-rename, so a crash never leaves a half-written record:
//!
//! ```text
//! base_path/
//! ├── vendors/{vendor_id}.json
//! ├── customers/{customer_id}.json
//! ├── events/{event_id}.json
//! ├── pools/{event_id}.json
//! └── tickets/{event_id}/{ticket_no}.json
//! ```
//!
//! The in-memory pools remain the source of truth; `TicketStore` mirrors
//! them for inspection and for restoring pools on the next start.

pub mod atomic;
pub mod error;
pub mod state_store;
pub mod ticket_store;

pub use error::{PersistenceError, Result};
pub use state_store::StateStore;
pub use ticket_store::TicketStore;
