//! Bounded ticket pool for TicketIn.
//!
//! One `TicketPool` exists per event. It is the single place where tickets
//! are created and sold:
//! - `release` appends an available ticket unless the pool is at capacity
//! - `purchase` sells the lowest-id available ticket unless none is left
//! - `snapshot` reads a consistent view for reporting and persistence
//!
//! Both mutating operations take the pool's mutex for the whole
//! check-and-update, so concurrent callers see them in a single total order.
//! Pools for different events never share a lock.
//!
//! # Example
//!
//! ```
//! use ticketin_models::{CustomerId, EventInfo, VendorId};
//! use ticketin_pool::{EventItem, PoolError};
//!
//! let vendor = VendorId::new();
//! let event = EventItem::with_pool(EventInfo::new("Gig", vendor.clone(), 1));
//! let pool = event.pool().unwrap();
//!
//! pool.release(&vendor).unwrap();
//! assert!(matches!(pool.release(&vendor), Err(PoolError::Full { .. })));
//!
//! let sold = pool.purchase(&CustomerId::new()).unwrap();
//! assert!(!sold.is_available());
//! ```

pub mod error;
pub mod event;
pub mod pool;
pub mod ticket;

pub use error::{PoolError, Result};
pub use event::EventItem;
pub use pool::{PoolSnapshot, TicketPool};
pub use ticket::{Ticket, TicketId};
