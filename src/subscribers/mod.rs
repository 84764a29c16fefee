//! # Event subscribers for the dispatcher.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out,
//! and (with the `logging` feature) the built-in `LogWriter`.
//!
//! ## Architecture
//! ```text
//! Lane / Handoff ── publish(Event) ──► Bus ──► event_listener (builder)
//!                                                   │
//!                                                   ▼
//!                                            SubscriberSet::emit
//!                                       ┌───────────┼───────────┐
//!                                       ▼           ▼           ▼
//!                                   LogWriter    Metrics     Custom ...
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
