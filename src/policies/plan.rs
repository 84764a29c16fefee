//! # Plan source: the collaborator that knows each client's subscription tier.
//!
//! The dispatcher never stores plans itself. It asks a [`PlanSource`] at two
//! points: when deriving a request's priority
//! ([`Dispatcher::submit_for_plan`](crate::Dispatcher::submit_for_plan)) and
//! when resolving a client's concurrency budget during admission.
//!
//! Lookups run on the dispatch loop, so implementations must be cheap and
//! non-blocking (an in-memory cache, not a database round trip).
//!
//! Any `Fn(&str) -> Option<String>` closure is a `PlanSource`:
//! ```rust
//! use docdispatch::PlanSource;
//!
//! let plans = |client: &str| (client == "acme").then(|| "deluxe".to_string());
//! assert_eq!(plans.plan_tier("acme").as_deref(), Some("deluxe"));
//! assert_eq!(plans.plan_tier("someone"), None);
//! ```

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Resolves a client's plan tier name.
pub trait PlanSource: Send + Sync + 'static {
    /// Returns the client's tier name, or `None` when the client has no plan.
    fn plan_tier(&self, client: &str) -> Option<String>;
}

impl<F> PlanSource for F
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    fn plan_tier(&self, client: &str) -> Option<String> {
        self(client)
    }
}

/// In-memory client → tier map.
///
/// Tiers can be changed at runtime (plan upgrades); the change applies to the
/// next priority derivation or budget check.
#[derive(Debug, Default)]
pub struct StaticPlans {
    tiers: RwLock<HashMap<String, String>>,
}

impl StaticPlans {
    /// Creates an empty map (every client resolves to `None`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with_client(self, client: &str, tier: &str) -> Self {
        self.set(client, tier);
        self
    }

    /// Sets or replaces a client's tier.
    pub fn set(&self, client: &str, tier: &str) {
        self.tiers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(client.to_string(), tier.to_string());
    }

    /// Removes a client's tier.
    pub fn remove(&self, client: &str) {
        self.tiers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(client);
    }
}

impl PlanSource for StaticPlans {
    fn plan_tier(&self, client: &str) -> Option<String> {
        self.tiers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(client)
            .cloned()
    }
}
