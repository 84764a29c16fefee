//! # Concurrency tracker: per (client, category) in-flight counters.
//!
//! ## Rules
//! - `try_admit` increments only if the current count is below the budget;
//!   otherwise it has no side effect.
//! - `release` decrements and floors at zero; the entry is removed once it
//!   reaches zero, so memory stays bounded by the number of busy clients.
//! - Budgets are resolved through the [`PlanSource`] and [`TierTable`]
//!   **outside** of the counter lock; a misbehaving plan source cannot poison
//!   the counters.
//! - Each category has its own counter map and lock.
//! - A [`Dispatcher`](crate::Dispatcher) never hands out its own tracker; its
//!   slots are released only by finishing jobs, which also wake the loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::policies::{PlanSource, TierTable};
use crate::requests::{Category, ClientId};

type Counters = HashMap<ClientId, usize>;

/// In-flight counters checked against each client's budget.
pub struct ConcurrencyTracker {
    tiers: TierTable,
    plans: Arc<dyn PlanSource>,
    counters: [Mutex<Counters>; Category::ALL.len()],
}

impl ConcurrencyTracker {
    /// Creates a tracker with empty counters.
    pub fn new(tiers: TierTable, plans: Arc<dyn PlanSource>) -> Self {
        Self {
            tiers,
            plans,
            counters: Default::default(),
        }
    }

    /// Tier table this tracker resolves budgets from.
    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    /// Plan source this tracker resolves tiers from.
    pub fn plans(&self) -> &Arc<dyn PlanSource> {
        &self.plans
    }

    /// Maximum concurrent in-flight operations for the client in `category`.
    pub fn budget(&self, client: &str, category: Category) -> usize {
        let tier = self.plans.plan_tier(client);
        self.tiers.budget(tier.as_deref(), category)
    }

    /// Takes a slot if the client is below its budget.
    ///
    /// Returns `true` (and increments) on success, `false` with no side effect otherwise.
    pub fn try_admit(&self, client: &ClientId, category: Category) -> bool {
        let budget = self.budget(client, category);
        self.admit_within(client, category, budget).is_some()
    }

    /// Takes a slot against an already-resolved budget.
    ///
    /// Returns the client's new in-flight count, or `None` if it is at its budget.
    pub(crate) fn admit_within(
        &self,
        client: &ClientId,
        category: Category,
        budget: usize,
    ) -> Option<usize> {
        let mut counters = self.lock(category);
        let current = counters.get(client).copied().unwrap_or(0);
        if current >= budget {
            return None;
        }
        counters.insert(Arc::clone(client), current + 1);
        Some(current + 1)
    }

    /// Returns a slot. Releasing a client with nothing in flight is a no-op.
    ///
    /// Returns the client's remaining in-flight count.
    pub fn release(&self, client: &str, category: Category) -> usize {
        let mut counters = self.lock(category);
        let Some(count) = counters.get_mut(client) else {
            return 0;
        };
        *count = count.saturating_sub(1);
        let remaining = *count;
        if remaining == 0 {
            counters.remove(client);
        }
        remaining
    }

    /// Current in-flight count of one client.
    pub fn in_flight(&self, client: &str, category: Category) -> usize {
        self.lock(category).get(client).copied().unwrap_or(0)
    }

    /// Total in-flight count of a category across clients.
    pub fn total_in_flight(&self, category: Category) -> usize {
        self.lock(category).values().sum()
    }

    /// Number of clients with at least one slot taken in `category`.
    pub fn busy_clients(&self, category: Category) -> usize {
        self.lock(category).len()
    }

    fn lock(&self, category: Category) -> MutexGuard<'_, Counters> {
        self.counters[category.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
