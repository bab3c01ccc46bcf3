//! Core records for TicketIn.
//!
//! Vendors, customers and events are created by the surrounding catalog
//! layer and are read-only to the simulation engine. Tickets and pools live
//! in `ticketin-pool`, since only the pool may change a ticket's state.

pub mod customer;
pub mod event;
pub mod ids;
pub mod vendor;

pub use customer::Customer;
pub use event::EventInfo;
pub use ids::{CustomerId, EventId, VendorId};
pub use vendor::Vendor;
