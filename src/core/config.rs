//! # Dispatcher configuration.
//!
//! Provides [`Config`], centralized settings loaded once at startup and
//! handed to [`Dispatcher::builder`](crate::Dispatcher::builder).
//!
//! ## Sentinel values
//! - `grace = 0s` → shutdown does not wait for running jobs
//! - `bus_capacity = 0` → clamped to 1 by the bus

use std::time::Duration;

use crate::policies::TierTable;

/// Global configuration for the dispatcher runtime.
///
/// ## Field semantics
/// - `grace`: Maximum wait for running jobs during shutdown
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `tiers`: Tier → priority / budget table (immutable after build)
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for admitted jobs to finish on shutdown.
    ///
    /// When exceeded, [`Dispatcher::shutdown`](crate::Dispatcher::shutdown)
    /// returns `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events
    /// skip the oldest ones.
    pub bus_capacity: usize,

    /// Plan tier table used for priorities and concurrency budgets.
    pub tiers: TierTable,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 60s`
    /// - `bus_capacity = 1024`
    /// - `tiers = TierTable::default()` (deluxe/premium/standard/free)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
            tiers: TierTable::default(),
        }
    }
}
