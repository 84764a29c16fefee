//! # Admission requests and their identifiers.
//!
//! An [`AdmissionRequest`] lives from submission until it is either admitted
//! (ownership of its [`Job`] moves to the handoff) or dropped on shutdown.

use std::fmt;
use std::sync::Arc;

use crate::jobs::JobRef;

use super::Category;

/// Client identifier as seen by the request-handling layer.
pub type ClientId = Arc<str>;

/// Numeric ordering priority; higher is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Priority(pub u32);

impl Priority {
    /// Returns the raw value.
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for Priority {
    fn from(v: u32) -> Self {
        Priority(v)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dispatcher-unique identifier of a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Pending request waiting for admission in its category.
pub struct AdmissionRequest {
    /// Identifier returned to the submitter.
    pub id: RequestId,
    /// Owning client; the concurrency budget is charged to it.
    pub client: ClientId,
    /// Category queue this request belongs to.
    pub category: Category,
    /// Ordering priority.
    pub priority: Priority,
    /// Work to run once admitted.
    pub(crate) job: JobRef,
}

impl AdmissionRequest {
    pub(crate) fn new(
        id: RequestId,
        client: ClientId,
        category: Category,
        priority: Priority,
        job: JobRef,
    ) -> Self {
        Self {
            id,
            client,
            category,
            priority,
            job,
        }
    }
}

impl fmt::Debug for AdmissionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionRequest")
            .field("id", &self.id)
            .field("client", &self.client)
            .field("category", &self.category)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
