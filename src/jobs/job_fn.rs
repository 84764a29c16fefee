//! # Closure-backed job (`JobFn`)
//!
//! [`JobFn`] wraps a closure `F: FnOnce(CancellationToken) -> Fut`. Unlike a
//! restartable task the closure is called once, so it may move captured
//! state (response channels, request bodies) into the future.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use docdispatch::{JobError, JobFn, JobRef};
//!
//! let body = vec![0u8; 16];
//! let job: JobRef = JobFn::boxed(move |_ctx: CancellationToken| async move {
//!     let _bytes = body.len();
//!     Ok::<_, JobError>(())
//! });
//! # drop(job);
//! ```

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::jobs::job::{Job, JobRef};

/// Function-backed job implementation.
pub struct JobFn<F> {
    f: F,
}

impl<F> JobFn<F> {
    /// Wraps the closure.
    ///
    /// Prefer [`JobFn::boxed`] when you immediately need a [`JobRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wraps the closure and returns it as a [`JobRef`].
    pub fn boxed<Fut>(f: F) -> JobRef
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        Box::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Job for JobFn<F>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static, // FnOnce: consumed on admission
    Fut: Future<Output = Result<(), JobError>> + Send + 'static,
{
    async fn run(self: Box<Self>, ctx: CancellationToken) -> Result<(), JobError> {
        let this = *self;
        (this.f)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closure_receives_token_and_result_is_forwarded() {
        let token = CancellationToken::new();
        token.cancel();
        let job = JobFn::boxed(|ctx: CancellationToken| async move {
            if ctx.is_cancelled() {
                Err(JobError::Canceled)
            } else {
                Ok::<(), JobError>(())
            }
        });
        let res = job.run(token).await;
        assert!(matches!(res, Err(JobError::Canceled)));
    }

    #[tokio::test]
    async fn captured_state_moves_into_future() {
        let (tx, rx) = tokio::sync::oneshot::channel::<&'static str>();
        let job = JobFn::boxed(move |_ctx| async move {
            tx.send("done").map_err(|_| JobError::Fail {
                error: "receiver gone".into(),
            })
        });
        job.run(CancellationToken::new()).await.unwrap();
        assert_eq!(rx.await.unwrap(), "done");
    }
}
