//! # Category registry: the fixed set of lanes.
//!
//! One [`Lane`] per [`Category`], created when the dispatcher is built and
//! never added or removed afterwards. Lookup by name is how submissions with
//! an unknown category get rejected before anything is queued.

use std::sync::Arc;

use crate::core::lane::{Lane, LaneContext};
use crate::error::SubmitError;
use crate::requests::Category;

pub(crate) struct Registry {
    lanes: Vec<Arc<Lane>>,
}

impl Registry {
    pub fn new(ctx: &Arc<LaneContext>) -> Self {
        let lanes = Category::ALL
            .into_iter()
            .map(|c| Lane::new(c, Arc::clone(ctx)))
            .collect();
        Self { lanes }
    }

    /// Lane of a known category.
    pub fn get(&self, category: Category) -> &Arc<Lane> {
        &self.lanes[category.index()]
    }

    /// Resolves a category name to its lane.
    pub fn resolve(&self, name: &str) -> Result<&Arc<Lane>, SubmitError> {
        let category: Category = name.parse()?;
        Ok(self.get(category))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Lane>> {
        self.lanes.iter()
    }
}
