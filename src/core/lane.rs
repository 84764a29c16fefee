//! # Lane: one category's queue and dispatch loop.
//!
//! Each [`Category`] owns exactly one lane. A lane is a two-state machine:
//!
//! ```text
//!            enqueue (while Idle)
//!   ┌──────┐ ───────────────────► ┌─────────┐
//!   │ Idle │                      │ Running │ ◄── enqueue / release: notify_one()
//!   └──────┘ ◄─────────────────── └─────────┘
//!            queue empty / shutdown
//! ```
//!
//! ## Dispatch loop
//! ```text
//! loop {
//!   ├─► lock state
//!   │     ├─ shutdown?     → Idle, exit
//!   │     ├─ queue empty?  → Idle, publish DispatcherIdle, exit
//!   │     └─ pass: visit pending requests best-first
//!   │            ├─ client already blocked this pass → skip
//!   │            ├─ budget lookup panicked           → discard (AdmissionFaulted)
//!   │            ├─ tracker admits                   → take (RequestAdmitted)
//!   │            └─ client at cap                    → leave queued, mark blocked
//!   ├─► hand every admitted request off (spawned, never awaited), unlock
//!   ├─► admitted or discarded something? → next pass
//!   └─► else wait for notify (enqueue or release) or shutdown
//! }
//! ```
//!
//! ## Rules
//! - At most one loop runs per lane: the Idle → Running transition happens
//!   under the state lock, and only the submitter that observed `Idle` spawns.
//! - No `.await` happens while the state lock is held.
//! - Admitted jobs are spawned on the job tracker before the lock is released,
//!   so a shutdown that has closed the lane cannot miss them.
//! - `Notify::notify_one` stores a permit when the loop is not parked yet, so
//!   a release that lands between a pass and the wait is never lost.
//! - An inadmissible request never blocks the ones behind it.

use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::handoff;
use crate::core::tracker::ConcurrencyTracker;
use crate::error::{SubmitError, panic_info};
use crate::events::{Bus, Event, EventKind};
use crate::requests::{AdmissionRequest, Category, ClientId, PendingQueue, Priority, RequestId, Verdict};

/// Runtime pieces shared by every lane of one dispatcher.
pub(crate) struct LaneContext {
    /// Runtime captured at build time; loops and jobs are spawned on it, so
    /// submission works from threads outside the runtime.
    pub runtime: Handle,
    pub tracker: ConcurrencyTracker,
    pub bus: Bus,
    pub jobs: TaskTracker,
    pub token: CancellationToken,
}

/// Dispatch loop state of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneStatus {
    /// No loop running; the queue is empty.
    Idle,
    /// A loop is draining the queue (possibly parked waiting for capacity).
    Running,
}

/// Point-in-time view of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySnapshot {
    /// Category described.
    pub category: Category,
    /// Loop state.
    pub status: LaneStatus,
    /// Requests waiting for admission.
    pub pending: usize,
    /// Admitted jobs not yet released, across clients.
    pub in_flight: usize,
    /// Priority of the next candidate, if any.
    pub head_priority: Option<Priority>,
}

struct LaneState {
    queue: PendingQueue,
    status: LaneStatus,
}

/// Admission granted during a pass.
struct Grant {
    in_flight: usize,
    budget: usize,
}

pub(crate) struct Lane {
    category: Category,
    state: Mutex<LaneState>,
    wake: Notify,
    ctx: Arc<LaneContext>,
}

impl Lane {
    pub fn new(category: Category, ctx: Arc<LaneContext>) -> Arc<Self> {
        Arc::new(Self {
            category,
            state: Mutex::new(LaneState {
                queue: PendingQueue::new(),
                status: LaneStatus::Idle,
            }),
            wake: Notify::new(),
            ctx,
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn context(&self) -> &Arc<LaneContext> {
        &self.ctx
    }

    /// Queues a request and makes sure a loop will look at it.
    pub fn enqueue(self: &Arc<Self>, req: AdmissionRequest) -> Result<RequestId, SubmitError> {
        let id = req.id;
        let queued = Event::new(EventKind::RequestQueued)
            .with_category(self.category)
            .with_client(Arc::clone(&req.client))
            .with_request(id)
            .with_priority(req.priority);

        let start = {
            let mut st = self.lock();
            if self.ctx.token.is_cancelled() {
                return Err(SubmitError::Closed);
            }
            st.queue.push(req);
            self.ctx.bus.publish(queued.with_pending(st.queue.len()));

            let idle = st.status == LaneStatus::Idle;
            if idle {
                st.status = LaneStatus::Running;
                self.ctx
                    .bus
                    .publish(Event::new(EventKind::DispatcherRunning).with_category(self.category));
            }
            idle
        };

        if start {
            self.ctx.runtime.spawn(Arc::clone(self).run());
        } else {
            self.wake.notify_one();
        }
        Ok(id)
    }

    /// Returns an admitted request's slot and wakes the loop.
    pub fn release(&self, client: &ClientId, request: RequestId) {
        let remaining = self.ctx.tracker.release(client, self.category);
        self.ctx.bus.publish(
            Event::new(EventKind::SlotReleased)
                .with_category(self.category)
                .with_client(Arc::clone(client))
                .with_request(request)
                .with_in_flight(remaining),
        );
        self.wake.notify_one();
    }

    /// Drops every pending request (shutdown). Their jobs never run.
    pub fn close(&self) -> usize {
        let dropped = self.lock().queue.drain();
        self.wake.notify_one();
        dropped.len()
    }

    pub fn snapshot(&self) -> CategorySnapshot {
        let st = self.lock();
        CategorySnapshot {
            category: self.category,
            status: st.status,
            pending: st.queue.len(),
            in_flight: self.ctx.tracker.total_in_flight(self.category),
            head_priority: st.queue.peek().map(|r| r.priority),
        }
    }

    async fn run(self: Arc<Self>) {
        loop {
            let progressed = {
                let mut st = self.lock();
                if self.ctx.token.is_cancelled() || st.queue.is_empty() {
                    st.status = LaneStatus::Idle;
                    self.ctx
                        .bus
                        .publish(Event::new(EventKind::DispatcherIdle).with_category(self.category));
                    return;
                }
                let (admitted, discarded) = self.pass(&mut st.queue);
                let progressed = !admitted.is_empty() || discarded > 0;
                // Spawned before unlocking: `close` takes this lock, so once
                // shutdown has closed the lanes every admitted job is tracked.
                for req in admitted {
                    handoff::hand_off(&self, req);
                }
                progressed
            };

            if progressed {
                continue;
            }

            tokio::select! {
                _ = self.ctx.token.cancelled() => {}
                _ = self.wake.notified() => {}
            }
        }
    }

    /// One admission pass over the queue, best candidate first.
    ///
    /// Returns the admitted requests and the number discarded.
    fn pass(&self, queue: &mut PendingQueue) -> (Vec<AdmissionRequest>, usize) {
        let tracker = &self.ctx.tracker;
        let mut budgets: HashMap<ClientId, usize> = HashMap::new();
        let mut blocked: HashSet<ClientId> = HashSet::new();
        let mut grants: Vec<Grant> = Vec::new();
        let mut faults: Vec<String> = Vec::new();

        let selection = queue.select(|req| {
            if blocked.contains(&req.client) {
                return Verdict::Defer;
            }
            let budget = match budgets.get(&req.client) {
                Some(b) => *b,
                None => {
                    let lookup =
                        catch_unwind(AssertUnwindSafe(|| tracker.budget(&req.client, self.category)));
                    match lookup {
                        Ok(b) => {
                            budgets.insert(Arc::clone(&req.client), b);
                            b
                        }
                        Err(payload) => {
                            faults.push(panic_info(&*payload));
                            return Verdict::Discard;
                        }
                    }
                }
            };
            match tracker.admit_within(&req.client, self.category, budget) {
                Some(in_flight) => {
                    grants.push(Grant { in_flight, budget });
                    Verdict::Admit
                }
                None => {
                    blocked.insert(Arc::clone(&req.client));
                    Verdict::Defer
                }
            }
        });

        for (req, reason) in selection.discarded.iter().zip(faults) {
            self.ctx.bus.publish(
                Event::new(EventKind::AdmissionFaulted)
                    .with_category(self.category)
                    .with_client(Arc::clone(&req.client))
                    .with_request(req.id)
                    .with_reason(reason),
            );
        }
        for (req, grant) in selection.admitted.iter().zip(&grants) {
            self.ctx.bus.publish(
                Event::new(EventKind::RequestAdmitted)
                    .with_category(self.category)
                    .with_client(Arc::clone(&req.client))
                    .with_request(req.id)
                    .with_priority(req.priority)
                    .with_slots(grant.in_flight, grant.budget),
            );
        }
        (selection.admitted, selection.discarded.len())
    }

    fn lock(&self) -> MutexGuard<'_, LaneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
