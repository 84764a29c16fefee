use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::{config::Config, dispatcher::Dispatcher, lane::LaneContext, tracker::ConcurrencyTracker};
use crate::{
    events::Bus,
    policies::{PlanSource, StaticPlans},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Dispatcher`] with optional collaborators.
pub struct DispatcherBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    plans: Option<Arc<dyn PlanSource>>,
}

impl DispatcherBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            plans: None,
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive dispatcher events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the plan tier collaborator.
    ///
    /// Without one every client resolves to no tier: lowest priority, default budget.
    pub fn with_plans(mut self, plans: impl PlanSource) -> Self {
        self.plans = Some(Arc::new(plans));
        self
    }

    /// Same as [`with_plans`](Self::with_plans) for a shared source.
    pub fn with_plan_source(mut self, plans: Arc<dyn PlanSource>) -> Self {
        self.plans = Some(plans);
        self
    }

    /// Builds and returns the Dispatcher instance.
    ///
    /// Must be called inside a tokio runtime: it spawns the subscriber workers
    /// and the event listener, and captures the runtime handle that category
    /// loops and jobs are later spawned on. After that, submitting works from
    /// any thread.
    pub fn build(self) -> Arc<Dispatcher> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let plans = self
            .plans
            .unwrap_or_else(|| Arc::new(StaticPlans::new()));

        let ctx = Arc::new(LaneContext {
            runtime: Handle::current(),
            tracker: ConcurrencyTracker::new(self.cfg.tiers.clone(), plans),
            bus: bus.clone(),
            jobs: TaskTracker::new(),
            token: CancellationToken::new(),
        });

        let listener_stop = CancellationToken::new();
        if !subs.is_empty() {
            event_listener(&bus, Arc::clone(&subs), listener_stop.clone());
        }
        Arc::new(Dispatcher::new_internal(self.cfg, ctx, subs, listener_stop))
    }
}

/// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
///
/// Keeps running after `Dispatcher::shutdown` so shutdown events still reach
/// subscribers; stops when the dispatcher is dropped, after forwarding what is
/// already buffered.
fn event_listener(bus: &Bus, set: Arc<SubscriberSet>, stop: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener lagged; events skipped");
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        }
        while let Ok(ev) = rx.try_recv() {
            set.emit(&ev);
        }
    });
}
