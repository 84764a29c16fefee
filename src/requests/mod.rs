//! # Request data model.
//!
//! - [`Category`] - fixed set of operation categories
//! - [`AdmissionRequest`] - a pending request with its priority and job
//! - [`Priority`], [`RequestId`], [`ClientId`] - identifiers and ordering values
//! - `PendingQueue` - per-category priority ordering (crate-internal)

mod category;
mod queue;
mod request;

pub use category::Category;
pub(crate) use queue::{PendingQueue, Verdict};
pub use request::{AdmissionRequest, ClientId, Priority, RequestId};
