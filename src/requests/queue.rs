//! # Per-category pending queue.
//!
//! Requests are kept in an ordered map keyed by `(Reverse(priority), arrival)`,
//! so in-order iteration always yields the highest priority first and, among
//! equal priorities, the earliest arrival first.
//!
//! ## Rules
//! - `arrival` is assigned by the queue itself and increases monotonically.
//! - [`PendingQueue::select`] visits every entry exactly once per call, in
//!   selection order, and removes only the entries the caller admits or discards.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use super::{AdmissionRequest, Priority};

/// Ordering key: max priority first, then FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    priority: Reverse<Priority>,
    arrival: u64,
}

/// Outcome of evaluating one queued request during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// Remove and hand off.
    Admit,
    /// Leave queued; revisit on the next pass.
    Defer,
    /// Remove without handing off (evaluation faulted).
    Discard,
}

/// Requests removed by one [`PendingQueue::select`] pass.
#[derive(Debug, Default)]
pub(crate) struct Selection {
    /// Admitted requests in admission order.
    pub admitted: Vec<AdmissionRequest>,
    /// Requests removed because their evaluation faulted.
    pub discarded: Vec<AdmissionRequest>,
}

/// Priority-ordered pending requests of one category.
#[derive(Debug, Default)]
pub(crate) struct PendingQueue {
    entries: BTreeMap<QueueKey, AdmissionRequest>,
    next_arrival: u64,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request behind every queued request of the same or higher priority.
    pub fn push(&mut self, req: AdmissionRequest) {
        let key = QueueKey {
            priority: Reverse(req.priority),
            arrival: self.next_arrival,
        };
        self.next_arrival += 1;
        self.entries.insert(key, req);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best candidate without removing it.
    pub fn peek(&self) -> Option<&AdmissionRequest> {
        self.entries.values().next()
    }

    /// Visits every queued request in selection order and removes the ones
    /// the closure admits or discards.
    pub fn select<F>(&mut self, mut verdict: F) -> Selection
    where
        F: FnMut(&AdmissionRequest) -> Verdict,
    {
        let mut admit_keys = Vec::new();
        let mut discard_keys = Vec::new();
        for (key, req) in &self.entries {
            match verdict(req) {
                Verdict::Admit => admit_keys.push(*key),
                Verdict::Discard => discard_keys.push(*key),
                Verdict::Defer => {}
            }
        }

        let mut take = |keys: Vec<QueueKey>| -> Vec<AdmissionRequest> {
            keys.into_iter()
                .filter_map(|k| self.entries.remove(&k))
                .collect()
        };
        let admitted = take(admit_keys);
        let discarded = take(discard_keys);
        Selection {
            admitted,
            discarded,
        }
    }

    /// Removes every queued request.
    pub fn drain(&mut self) -> Vec<AdmissionRequest> {
        std::mem::take(&mut self.entries).into_values().collect()
    }
}
