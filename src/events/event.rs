//! # Runtime events emitted by the dispatcher.
//!
//! The [`EventKind`] enum classifies event types across four groups:
//! - **Admission events**: a request was queued, admitted, or faulted during admission
//! - **Job events**: an admitted job completed, failed, or panicked; its slot was released
//! - **Loop events**: a category's dispatch loop started or went idle
//! - **Runtime events**: shutdown progress and subscriber health
//!
//! The [`Event`] struct carries optional metadata (category, client, request id,
//! priority, counters, reason) depending on the kind.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use docdispatch::{Category, Event, EventKind, Priority};
//!
//! let ev = Event::new(EventKind::RequestAdmitted)
//!     .with_category(Category::Conversion)
//!     .with_client("acme")
//!     .with_priority(Priority(4))
//!     .with_slots(1, 2);
//!
//! assert_eq!(ev.kind, EventKind::RequestAdmitted);
//! assert_eq!(ev.client.as_deref(), Some("acme"));
//! assert_eq!(ev.budget, Some(2));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::requests::{Category, Priority, RequestId};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: subscriber name and panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and reason ("full", "closed")
    SubscriberOverflow,

    // === Admission events ===
    /// Request accepted into its category queue.
    ///
    /// Sets:
    /// - `category`, `client`, `request`, `priority`
    /// - `pending`: queue length after the push
    RequestQueued,

    /// Request admitted; its job is being handed off.
    ///
    /// Sets:
    /// - `category`, `client`, `request`, `priority`
    /// - `in_flight`: client's in-flight count after admission
    /// - `budget`: client's budget in this category
    RequestAdmitted,

    /// Evaluating a request for admission panicked; the request was dropped.
    ///
    /// Sets:
    /// - `category`, `client`, `request`
    /// - `reason`: panic info
    AdmissionFaulted,

    // === Job events ===
    /// Job returned `Ok(())`.
    ///
    /// Sets:
    /// - `category`, `client`, `request`
    /// - `elapsed_ms`: time from admission to completion
    JobCompleted,

    /// Job returned an error.
    ///
    /// Sets:
    /// - `category`, `client`, `request`, `elapsed_ms`
    /// - `reason`: error message
    JobFailed,

    /// Job panicked.
    ///
    /// Sets:
    /// - `category`, `client`, `request`, `elapsed_ms`
    /// - `reason`: panic info
    JobPanicked,

    /// Concurrency slot returned to the tracker.
    ///
    /// Sets:
    /// - `category`, `client`, `request`
    /// - `in_flight`: client's in-flight count after release
    SlotReleased,

    // === Loop events ===
    /// Category dispatch loop moved Idle → Running.
    ///
    /// Sets:
    /// - `category`
    DispatcherRunning,

    /// Category dispatch loop moved Running → Idle (queue empty).
    ///
    /// Sets:
    /// - `category`
    DispatcherIdle,

    // === Shutdown events ===
    /// Shutdown requested.
    ShutdownRequested,

    /// All jobs stopped within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some jobs did not stop in time.
    ///
    /// Sets:
    /// - `in_flight`: number of jobs still running
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Category the event concerns.
    pub category: Option<Category>,
    /// Client the event concerns.
    pub client: Option<Arc<str>>,
    /// Request the event concerns.
    pub request: Option<RequestId>,
    /// Request priority.
    pub priority: Option<Priority>,
    /// Queue length after the event.
    pub pending: Option<u32>,
    /// Client's in-flight count after the event.
    pub in_flight: Option<u32>,
    /// Client's budget in the category.
    pub budget: Option<u32>,
    /// Admission-to-finish duration in milliseconds (compact).
    pub elapsed_ms: Option<u32>,
    /// Human-readable reason (errors, panic info, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            category: None,
            client: None,
            request: None,
            priority: None,
            pending: None,
            in_flight: None,
            budget: None,
            elapsed_ms: None,
            reason: None,
        }
    }

    /// Attaches a category.
    #[inline]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Attaches a client identifier.
    #[inline]
    pub fn with_client(mut self, client: impl Into<Arc<str>>) -> Self {
        self.client = Some(client.into());
        self
    }

    /// Attaches a request id.
    #[inline]
    pub fn with_request(mut self, id: RequestId) -> Self {
        self.request = Some(id);
        self
    }

    /// Attaches a priority.
    #[inline]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Attaches the queue length.
    #[inline]
    pub fn with_pending(mut self, pending: usize) -> Self {
        self.pending = Some(clamp_u32(pending));
        self
    }

    /// Attaches the in-flight count.
    #[inline]
    pub fn with_in_flight(mut self, in_flight: usize) -> Self {
        self.in_flight = Some(clamp_u32(in_flight));
        self
    }

    /// Attaches in-flight count and budget together.
    #[inline]
    pub fn with_slots(self, in_flight: usize, budget: usize) -> Self {
        let mut ev = self.with_in_flight(in_flight);
        ev.budget = Some(clamp_u32(budget));
        ev
    }

    /// Attaches an elapsed duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.elapsed_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    /// True for events produced by subscriber workers themselves.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

fn clamp_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
