//! # docdispatch
//!
//! **docdispatch** is the admission and dispatch core of a document-operations
//! backend (conversion, editing, AI tools).
//!
//! Requests are grouped into fixed [`Category`] queues. Within a category they
//! are admitted in priority order (derived from the client's plan tier), while
//! every client is capped at a per-category number of in-flight operations.
//! A client at its cap never blocks anyone else: the dispatch loop scans past
//! it and wakes up again on release or on a new submission, never on a timer.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   submit(client, category, priority, job)     submit_for_plan(client, category, job)
//!          │                                            │ PlanSource + TierTable → Priority
//!          └────────────────────┬───────────────────────┘
//!                               ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Dispatcher                                                       │
//! │  - Registry (one Lane per Category, fixed)                        │
//! │  - ConcurrencyTracker (client, category) → in-flight / budget     │
//! │  - Bus (broadcast events) → SubscriberSet                         │
//! │  - TaskTracker (running jobs, for graceful shutdown)              │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ Lane         │   │ Lane         │   │ Lane         │
//!   │ (conversion) │   │ (editor)     │   │ (ai)         │
//!   │ queue + loop │   │ queue + loop │   │ queue + loop │
//!   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!          │ admitted         │                  │
//!          ▼                  ▼                  ▼
//!      handoff: spawn job.run(token); SlotGuard releases slot on every exit path
//! ```
//!
//! ### Lifecycle of a request
//! ```text
//! pending ──(try_admit ok)──► admitted ──(job returns / fails / panics)──► completed
//!    │                            │                                          │
//!    │ client at cap: stays       │ RequestAdmitted                          │ SlotReleased
//!    │ queued, loop scans past    │                                          │ → loop re-evaluates
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                         |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------|
//! | **Dispatch**      | Per-category priority queues and budget-capped admission.     | [`Dispatcher`], [`Category`]               |
//! | **Policies**      | Tier → priority and per-category concurrency budgets.         | [`TierTable`], [`PlanSource`]              |
//! | **Jobs**          | Continuations run exactly once after admission.               | [`Job`], [`JobFn`], [`JobRef`]             |
//! | **Subscriber API**| Hook into admission and job lifecycle events.                 | [`Subscribe`], [`Event`], [`EventKind`]    |
//! | **Errors**        | Typed errors for submission, jobs and shutdown.               | [`SubmitError`], [`JobError`], [`RuntimeError`] |
//! | **Configuration** | Centralized runtime settings.                                 | [`Config`]                                 |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a subscriber that renders events as `tracing` records.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use docdispatch::{Config, Dispatcher, JobError, JobFn, SubmitError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.grace = Duration::from_secs(5);
//!     let dispatcher = Dispatcher::builder(cfg).build();
//!
//!     let (tx, rx) = tokio::sync::oneshot::channel();
//!     dispatcher.submit("client-1", "editor", 2u32, JobFn::boxed(move |_ctx| async move {
//!         let _ = tx.send(());
//!         Ok::<_, JobError>(())
//!     }))?;
//!     rx.await?;
//!
//!     let rejected = dispatcher.submit("client-1", "merge", 2u32, JobFn::boxed(|_ctx| async { Ok::<_, JobError>(()) }));
//!     assert!(matches!(rejected, Err(SubmitError::InvalidCategory { .. })));
//!
//!     dispatcher.shutdown().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod jobs;
mod policies;
mod requests;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    CategorySnapshot, ConcurrencyTracker, Config, Dispatcher, DispatcherBuilder, LaneStatus,
};
pub use error::{JobError, RuntimeError, SubmitError};
pub use events::{Bus, Event, EventKind};
pub use jobs::{Job, JobFn, JobRef};
pub use policies::{PlanSource, StaticPlans, TierTable};
pub use requests::{AdmissionRequest, Category, ClientId, Priority, RequestId};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: a subscriber that writes events through `tracing`.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
