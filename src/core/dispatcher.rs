//! # Dispatcher: per-category admission, dispatch, and graceful shutdown.
//!
//! The [`Dispatcher`] owns the category registry, the concurrency tracker, the
//! event bus and the job tracker. Request handlers call
//! [`submit`](Dispatcher::submit) and return; the job they pass in runs once
//! its request is admitted.
//!
//! ## High-level architecture
//! ```text
//! submit(client, "conversion", priority, job)
//!     │  Registry::resolve(name)  ── unknown ──► Err(InvalidCategory)
//!     ▼
//!   Lane[conversion] ── enqueue ──► PendingQueue (priority, arrival)
//!     │                               │
//!     │ Idle? spawn loop              │ dispatch loop pass
//!     │ Running? notify               ▼
//!     │                        ConcurrencyTracker::admit_within(budget)
//!     │                               │ admitted
//!     ▼                               ▼
//!   Bus ◄──── events ──────── handoff: jobs.spawn(job.run(token))
//!     │                               │ finished / failed / panicked
//!     ▼                               ▼
//!   SubscriberSet             SlotGuard::drop → release → notify lane
//!
//! Shutdown path:
//!   shutdown()
//!     └─► publish(ShutdownRequested)
//!     └─► token.cancel()    → loops exit, running jobs see a cancelled token
//!     └─► lanes.close()     → pending requests dropped unrun
//!     └─► wait jobs within cfg.grace:
//!            ├─ Ok      → publish(AllStoppedWithin)
//!            └─ Timeout → publish(GraceExceeded), Err(RuntimeError::GraceExceeded)
//! ```
//!
//! ## Example
//! ```rust
//! use docdispatch::{Config, Dispatcher, JobError, JobFn, StaticPlans};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let plans = StaticPlans::new().with_client("acme", "deluxe");
//!     let dispatcher = Dispatcher::builder(Config::default())
//!         .with_plans(plans)
//!         .build();
//!
//!     let (tx, rx) = tokio::sync::oneshot::channel();
//!     dispatcher.submit_for_plan("acme", "conversion", JobFn::boxed(move |_ctx| async move {
//!         // convert the document...
//!         let _ = tx.send("converted");
//!         Ok::<_, JobError>(())
//!     }))?;
//!
//!     assert_eq!(rx.await?, "converted");
//!     dispatcher.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::core::builder::DispatcherBuilder;
use crate::core::config::Config;
use crate::core::lane::{CategorySnapshot, Lane, LaneContext, LaneStatus};
use crate::core::registry::Registry;
use crate::error::{RuntimeError, SubmitError};
use crate::events::{Event, EventKind};
use crate::jobs::JobRef;
use crate::requests::{AdmissionRequest, Category, ClientId, Priority, RequestId};
use crate::subscribers::SubscriberSet;

/// Priority-ordered, budget-capped admission of document operations.
pub struct Dispatcher {
    cfg: Config,
    registry: Registry,
    ctx: Arc<LaneContext>,
    subs: Arc<SubscriberSet>,
    listener_stop: CancellationToken,
    next_id: AtomicU64,
}

impl Dispatcher {
    /// Starts building a dispatcher from `cfg`.
    pub fn builder(cfg: Config) -> DispatcherBuilder {
        DispatcherBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        ctx: Arc<LaneContext>,
        subs: Arc<SubscriberSet>,
        listener_stop: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            registry: Registry::new(&ctx),
            ctx,
            subs,
            listener_stop,
            next_id: AtomicU64::new(1),
        }
    }

    /// Queues `job` under `category` with an explicit priority.
    ///
    /// Fails synchronously with [`SubmitError::InvalidCategory`] for an unknown
    /// category name and [`SubmitError::Closed`] after shutdown; the job is
    /// dropped unrun in both cases.
    pub fn submit(
        &self,
        client: impl Into<ClientId>,
        category: &str,
        priority: impl Into<Priority>,
        job: JobRef,
    ) -> Result<RequestId, SubmitError> {
        let lane = self.registry.resolve(category)?;
        self.enqueue(lane, client.into(), priority.into(), job)
    }

    /// Same as [`submit`](Self::submit) for an already-typed category.
    pub fn submit_to(
        &self,
        client: impl Into<ClientId>,
        category: Category,
        priority: impl Into<Priority>,
        job: JobRef,
    ) -> Result<RequestId, SubmitError> {
        let lane = self.registry.get(category);
        self.enqueue(lane, client.into(), priority.into(), job)
    }

    /// Queues `job` with the priority of the client's plan tier.
    pub fn submit_for_plan(
        &self,
        client: impl Into<ClientId>,
        category: &str,
        job: JobRef,
    ) -> Result<RequestId, SubmitError> {
        let lane = self.registry.resolve(category)?;
        let client = client.into();
        let priority = self.priority_for(&client);
        self.enqueue(lane, client, priority, job)
    }

    fn enqueue(
        &self,
        lane: &Arc<Lane>,
        client: ClientId,
        priority: Priority,
        job: JobRef,
    ) -> Result<RequestId, SubmitError> {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let req = AdmissionRequest::new(id, client, lane.category(), priority, job);
        lane.enqueue(req)
    }

    /// Priority a request from `client` gets from its plan tier.
    pub fn priority_for(&self, client: &str) -> Priority {
        let tier = self.ctx.tracker.plans().plan_tier(client);
        self.ctx.tracker.tiers().priority(tier.as_deref())
    }

    /// Concurrency budget of `client` in `category`.
    pub fn budget(&self, client: &str, category: Category) -> usize {
        self.ctx.tracker.budget(client, category)
    }

    /// Current in-flight count of `client` in `category`.
    pub fn in_flight(&self, client: &str, category: Category) -> usize {
        self.ctx.tracker.in_flight(client, category)
    }

    /// Admitted, unreleased jobs of `category` across clients.
    ///
    /// Counters are read-only from outside: slots are only taken by the
    /// dispatch loop and only returned when a job finishes, which also wakes
    /// the loop.
    pub fn total_in_flight(&self, category: Category) -> usize {
        self.ctx.tracker.total_in_flight(category)
    }

    /// Loop state of one category.
    pub fn status(&self, category: Category) -> LaneStatus {
        self.registry.get(category).snapshot().status
    }

    /// Point-in-time view of every category, in registry order.
    pub fn snapshot(&self) -> Vec<CategorySnapshot> {
        self.registry.iter().map(|lane| lane.snapshot()).collect()
    }

    /// Receiver for every event published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.ctx.bus.subscribe()
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    /// Configuration the dispatcher was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// True once [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.ctx.token.is_cancelled()
    }

    /// Stops admission and waits up to [`Config::grace`] for running jobs.
    ///
    /// Pending requests are dropped without running. Running jobs observe a
    /// cancelled token. Calling it again only waits again.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        if !self.ctx.token.is_cancelled() {
            self.ctx.bus.publish(Event::new(EventKind::ShutdownRequested));
            self.ctx.token.cancel();
            let dropped: usize = self.registry.iter().map(|lane| lane.close()).sum();
            if dropped > 0 {
                tracing::debug!(dropped, "pending requests dropped on shutdown");
            }
            self.ctx.jobs.close();
        }

        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, self.ctx.jobs.wait()).await {
            Ok(()) => {
                self.ctx.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                let in_flight = self.ctx.jobs.len();
                self.ctx
                    .bus
                    .publish(Event::new(EventKind::GraceExceeded).with_in_flight(in_flight));
                Err(RuntimeError::GraceExceeded { grace, in_flight })
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Parked loops hold their lane alive; cancelling lets them exit.
        self.ctx.token.cancel();
        self.listener_stop.cancel();
    }
}
