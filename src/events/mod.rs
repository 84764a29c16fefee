//! Dispatcher events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: category lanes (queue/admit/idle), job handoffs
//!   (complete/fail/panic/release), `Dispatcher` (shutdown), subscriber workers.
//! - **Consumers**: the builder's event listener, which fans out to the
//!   [`SubscriberSet`](crate::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
