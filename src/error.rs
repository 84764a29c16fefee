//! Error types used by the dispatcher and by jobs.
//!
//! This module defines three error enums:
//!
//! - [`SubmitError`]: a submission was rejected synchronously.
//! - [`JobError`]: an admitted operation failed.
//! - [`RuntimeError`]: the dispatcher itself could not shut down cleanly.
//!
//! All types provide `as_label` for logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors returned by [`Dispatcher::submit`](crate::Dispatcher::submit).
///
/// A rejected request is never enqueued and its job is dropped unrun.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The category name is not one of the fixed known categories.
    #[error("invalid queue category: {name:?}")]
    InvalidCategory {
        /// The name that failed to resolve.
        name: String,
    },

    /// The dispatcher has been shut down.
    #[error("dispatcher closed")]
    Closed,
}

impl SubmitError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use docdispatch::SubmitError;
    ///
    /// assert_eq!(SubmitError::Closed.as_label(), "submit_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SubmitError::InvalidCategory { .. } => "submit_invalid_category",
            SubmitError::Closed => "submit_closed",
        }
    }
}

/// # Errors produced by admitted jobs.
///
/// The dispatcher never retries a job; these errors are only reported to
/// subscribers. The concurrency slot is released whatever the variant.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum JobError {
    /// The operation failed.
    #[error("operation failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The operation observed dispatcher shutdown and stopped early.
    #[error("context cancelled")]
    Canceled,
}

impl JobError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use docdispatch::JobError;
    ///
    /// let err = JobError::Fail { error: "corrupt pdf".into() };
    /// assert_eq!(err.as_label(), "job_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Canceled => "job_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            JobError::Fail { error } => format!("error: {error}"),
            JobError::Canceled => "context cancelled".to_string(),
        }
    }
}

/// # Errors produced by the dispatcher runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period elapsed while jobs were still running.
    #[error("shutdown timeout {grace:?} exceeded; {in_flight} job(s) still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Jobs still running when the grace period ended.
        in_flight: usize,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, in_flight } => {
                format!("grace exceeded after {grace:?}; in_flight={in_flight}")
            }
        }
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_info(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
