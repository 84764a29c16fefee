//! Runtime core: admission, dispatch, and lifecycle.
//!
//! The public API from this module is [`Dispatcher`] (plus its builder,
//! configuration, tracker and snapshot types).
//!
//! Internal modules:
//! - [`registry`]: fixed set of per-category lanes;
//! - [`lane`]: per-category pending queue and dispatch loop;
//! - [`tracker`]: per (client, category) in-flight counters;
//! - [`handoff`]: runs admitted jobs and returns their slots;
//! - [`dispatcher`]: submission entry points and graceful shutdown.

mod builder;
mod config;
mod dispatcher;
mod handoff;
mod lane;
mod registry;
mod tracker;

pub use builder::DispatcherBuilder;
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use lane::{CategorySnapshot, LaneStatus};
pub use tracker::ConcurrencyTracker;
