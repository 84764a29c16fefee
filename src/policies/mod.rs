//! Tier and plan policies.
//!
//! This module groups the knobs that decide **how urgent** a request is and
//! **how many** requests a client may have in flight.
//!
//! ## Contents
//! - [`TierTable`] static tier → priority / per-category budget table
//! - [`PlanSource`] collaborator that resolves a client's tier
//! - [`StaticPlans`] in-memory `PlanSource`
//!
//! ## Quick wiring
//! ```text
//! submit_for_plan(client, ..)
//!      └─► PlanSource::plan_tier(client) ─► TierTable::priority(tier)
//! dispatch loop
//!      └─► PlanSource::plan_tier(client) ─► TierTable::budget(tier, category)
//!                                         └─► ConcurrencyTracker::try_admit
//! ```

mod plan;
mod tier;

pub use plan::{PlanSource, StaticPlans};
pub use tier::TierTable;
