//! # Continuations run after admission.
//!
//! - [`Job`] - trait for one-shot async operations
//! - [`JobFn`] - closure-backed implementation
//! - [`JobRef`] - owned `Box<dyn Job>`

mod job;
mod job_fn;

pub use job::{Job, JobRef};
pub use job_fn::JobFn;
