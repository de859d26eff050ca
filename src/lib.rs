//! # Wait counter
//!
//! A non-negative counter of outstanding units of work that can be waited on
//! until it drops back to zero. Increments and decrements are lock-free
//! unless they move the counter from or to zero.
//!
//! ## Examples
//!
//! Waiting for spawned work
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use wait_counter::Counter;
//!
//! let in_flight = Arc::new(Counter::default());
//!
//! for i in 0..4 {
//!     let unit = in_flight.account_owned();
//!     thread::spawn(move || {
//!         println!("hello from worker {i}");
//!         drop(unit);
//!     });
//! }
//!
//! // Returns once every worker has dropped its unit:
//! in_flight.wait();
//! assert_eq!(in_flight.value(), 0);
//! ```
//!
//! Counting by hand
//!
//! ```
//! use wait_counter::{Counter, Placement};
//!
//! let counter = Counter::new(Placement::Private, 0);
//! counter.increment();
//! counter.increment();
//! counter.decrement();
//! assert_eq!(counter.value(), 1);
//! counter.decrement();
//! counter.wait();
//! ```

mod account;
mod counter;
mod error;
pub mod sem;

pub use crate::account::{Account, OwnedAccount};
pub use crate::counter::Counter;
pub use crate::error::{Error, Result};
pub use crate::sem::{Placement, Semaphore};
