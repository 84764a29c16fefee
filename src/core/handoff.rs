//! # Handoff: run an admitted job and always give its slot back.
//!
//! ```text
//! Lane::pass ── admitted ──► hand_off()
//!                               ├─► SlotGuard::new(lane, client, request)
//!                               └─► jobs.spawn_on(async {
//!                                      job.run(child_token).catch_unwind()
//!                                        ├─ Ok(Ok)    → JobCompleted
//!                                        ├─ Ok(Err)   → JobFailed
//!                                        └─ Err(panic)→ JobPanicked
//!                                      drop(guard) → Lane::release → SlotReleased + wake
//!                                  }, runtime)
//! ```
//!
//! ## Rules
//! - The job is moved into exactly one spawned task, so it runs exactly once.
//! - The slot is returned by `SlotGuard::drop`, which also runs if the task is
//!   aborted or dropped by the runtime before the job finishes.
//! - The dispatch loop never awaits the spawned task.

use std::sync::Arc;

use futures::FutureExt;
use tokio::time::Instant;

use crate::core::lane::Lane;
use crate::error::panic_info;
use crate::events::{Event, EventKind};
use crate::requests::{AdmissionRequest, ClientId, RequestId};

/// Returns the admitted slot to the tracker when dropped.
struct SlotGuard {
    lane: Arc<Lane>,
    client: ClientId,
    request: RequestId,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.lane.release(&self.client, self.request);
    }
}

/// Spawns the admitted request's job on the dispatcher's job tracker.
pub(crate) fn hand_off(lane: &Arc<Lane>, req: AdmissionRequest) {
    let AdmissionRequest {
        id,
        client,
        category,
        job,
        ..
    } = req;

    let ctx = lane.context();
    let token = ctx.token.child_token();
    let bus = ctx.bus.clone();
    let guard = SlotGuard {
        lane: Arc::clone(lane),
        client: Arc::clone(&client),
        request: id,
    };

    let task = async move {
        let started = Instant::now();
        let outcome = std::panic::AssertUnwindSafe(job.run(token))
            .catch_unwind()
            .await;

        let ev = match outcome {
            Ok(Ok(())) => Event::new(EventKind::JobCompleted),
            Ok(Err(e)) => Event::new(EventKind::JobFailed).with_reason(e.to_string()),
            Err(payload) => {
                Event::new(EventKind::JobPanicked).with_reason(panic_info(&*payload))
            }
        };
        bus.publish(
            ev.with_category(category)
                .with_client(client)
                .with_request(id)
                .with_elapsed(started.elapsed()),
        );
        drop(guard);
    };
    ctx.jobs.spawn_on(task, &ctx.runtime);
}
