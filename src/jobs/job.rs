//! # Continuation handed to the operation layer on admission.
//!
//! A [`Job`] is the opaque callback that performs the actual document
//! operation once its request is admitted. It is consumed by value, so the
//! runtime can run it **at most once**; the handoff guarantees it runs
//! **exactly once** for every admitted request.
//!
//! The job receives a [`CancellationToken`] that fires on dispatcher shutdown.
//! Long-running operations should watch it and return early.
//!
//! # Example
//! ```
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use docdispatch::{Job, JobError};
//!
//! struct Convert { path: String }
//!
//! #[async_trait]
//! impl Job for Convert {
//!     async fn run(self: Box<Self>, ctx: CancellationToken) -> Result<(), JobError> {
//!         if ctx.is_cancelled() {
//!             return Err(JobError::Canceled);
//!         }
//!         // convert self.path ...
//!         let _ = self.path;
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;

/// One-shot asynchronous unit of work run after admission.
#[async_trait]
pub trait Job: Send + 'static {
    /// Runs the operation to completion.
    ///
    /// Errors are reported to subscribers; the concurrency slot is released
    /// regardless of the outcome.
    async fn run(self: Box<Self>, ctx: CancellationToken) -> Result<(), JobError>;
}

/// Owned, type-erased job.
pub type JobRef = Box<dyn Job>;
