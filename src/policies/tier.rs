//! # Tier table: plan tier → priority and concurrency budget.
//!
//! [`TierTable`] is static configuration, built once at startup and shared
//! read-only by the dispatcher. It answers two questions:
//!
//! - **priority**: which [`Priority`] a request from a given tier gets;
//! - **budget**: how many requests a client of a given tier may have in flight
//!   per [`Category`].
//!
//! ## Rules
//! - Tier names are matched case-insensitively (`"Deluxe"` == `"deluxe"`).
//! - An unknown or absent tier maps to the **lowest** configured priority.
//! - Budgets default to [`TierTable::default_budget`] (1); individual
//!   tier/category pairs may be raised with [`TierTable::with_budget`].
//! - Budgets are clamped to a minimum of 1; a zero budget would park a client's
//!   requests forever.
//!
//! ## Defaults
//! ```text
//! deluxe   → 4     (deluxe, conversion) → 2 in flight
//! premium  → 3     everything else      → 1 in flight
//! standard → 2
//! free     → 1
//! ```
//!
//! ## Example
//! ```rust
//! use docdispatch::{Category, Priority, TierTable};
//!
//! let table = TierTable::empty()
//!     .with_tier("gold", 10)
//!     .with_tier("basic", 1)
//!     .with_budget("gold", Category::Ai, 3);
//!
//! assert_eq!(table.priority(Some("GOLD")), Priority(10));
//! assert_eq!(table.priority(Some("unknown")), Priority(1));
//! assert_eq!(table.budget(Some("gold"), Category::Ai), 3);
//! assert_eq!(table.budget(Some("gold"), Category::Editor), 1);
//! ```

use std::collections::HashMap;

use crate::requests::{Category, Priority};

/// Static tier → priority/budget configuration.
#[derive(Clone, Debug)]
pub struct TierTable {
    priorities: HashMap<String, Priority>,
    budgets: HashMap<(String, Category), usize>,
    default_budget: usize,
}

impl TierTable {
    /// Creates a table with no tiers and a default budget of 1.
    pub fn empty() -> Self {
        Self {
            priorities: HashMap::new(),
            budgets: HashMap::new(),
            default_budget: 1,
        }
    }

    /// Registers (or overrides) a tier's priority.
    #[must_use]
    pub fn with_tier(mut self, tier: &str, priority: u32) -> Self {
        self.priorities.insert(normalize(tier), Priority(priority));
        self
    }

    /// Raises (or lowers) the budget of one tier/category pair.
    #[must_use]
    pub fn with_budget(mut self, tier: &str, category: Category, budget: usize) -> Self {
        self.budgets.insert((normalize(tier), category), budget.max(1));
        self
    }

    /// Sets the budget applied to every pair without an explicit entry.
    #[must_use]
    pub fn with_default_budget(mut self, budget: usize) -> Self {
        self.default_budget = budget.max(1);
        self
    }

    /// Budget applied to pairs without an explicit entry.
    #[inline]
    pub fn default_budget(&self) -> usize {
        self.default_budget
    }

    /// Lowest configured priority (`Priority(0)` for an empty table).
    pub fn lowest_priority(&self) -> Priority {
        self.priorities.values().min().copied().unwrap_or_default()
    }

    /// Resolves a tier to its priority; unknown or absent tiers get the lowest.
    pub fn priority(&self, tier: Option<&str>) -> Priority {
        tier.and_then(|t| self.priorities.get(&normalize(t)).copied())
            .unwrap_or_else(|| self.lowest_priority())
    }

    /// Resolves the concurrency budget of a tier within a category.
    pub fn budget(&self, tier: Option<&str>, category: Category) -> usize {
        tier.and_then(|t| self.budgets.get(&(normalize(t), category)).copied())
            .unwrap_or(self.default_budget)
    }
}

impl Default for TierTable {
    /// Subscription tiers of the document API:
    ///
    /// - `deluxe = 4`, `premium = 3`, `standard = 2`, `free = 1`
    /// - `deluxe` may run 2 conversions at once; every other pair runs 1.
    fn default() -> Self {
        TierTable::empty()
            .with_tier("deluxe", 4)
            .with_tier("premium", 3)
            .with_tier("standard", 2)
            .with_tier("free", 1)
            .with_budget("deluxe", Category::Conversion, 2)
    }
}

fn normalize(tier: &str) -> String {
    tier.trim().to_ascii_lowercase()
}
