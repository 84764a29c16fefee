//! # LogWriter: events as `tracing` records
//!
//! A subscriber that renders every [`Event`] as a structured `tracing` record
//! under the `docdispatch` target. Install any `tracing` subscriber
//! (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Levels
//! - `debug`: queueing, loop running/idle, slot release
//! - `info`: admission, job completion, shutdown progress
//! - `warn`: job failure, admission fault, subscriber overflow/panic, grace exceeded
//! - `error`: job panic
//!
//! ## Example output (fmt layer)
//! ```text
//! DEBUG docdispatch: queued seq=12 category="conversion" client="acme" request=req-7 priority=4 pending=3
//!  INFO docdispatch: admitted seq=15 category="conversion" client="acme" request=req-7 priority=4 in_flight=2 budget=2
//!  WARN docdispatch: job failed seq=31 category="conversion" client="acme" request=req-7 elapsed_ms=812 reason="corrupt pdf"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let category = e.category.map(|c| c.as_str()).unwrap_or("-");
        let client = e.client.as_deref().unwrap_or("-");
        let request = e.request.map(tracing::field::display);
        let priority = e.priority.map(|p| p.get());
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::RequestQueued => {
                tracing::debug!(target: "docdispatch", seq = e.seq, category, client, request,
                    priority, pending = e.pending, "queued");
            }
            EventKind::RequestAdmitted => {
                tracing::info!(target: "docdispatch", seq = e.seq, category, client, request,
                    priority, in_flight = e.in_flight, budget = e.budget, "admitted");
            }
            EventKind::AdmissionFaulted => {
                tracing::warn!(target: "docdispatch", seq = e.seq, category, client, request,
                    reason, "admission faulted; request dropped");
            }
            EventKind::JobCompleted => {
                tracing::info!(target: "docdispatch", seq = e.seq, category, client, request,
                    elapsed_ms = e.elapsed_ms, "job completed");
            }
            EventKind::JobFailed => {
                tracing::warn!(target: "docdispatch", seq = e.seq, category, client, request,
                    elapsed_ms = e.elapsed_ms, reason, "job failed");
            }
            EventKind::JobPanicked => {
                tracing::error!(target: "docdispatch", seq = e.seq, category, client, request,
                    elapsed_ms = e.elapsed_ms, reason, "job panicked");
            }
            EventKind::SlotReleased => {
                tracing::debug!(target: "docdispatch", seq = e.seq, category, client, request,
                    in_flight = e.in_flight, "slot released");
            }
            EventKind::DispatcherRunning => {
                tracing::debug!(target: "docdispatch", seq = e.seq, category, "dispatch loop running");
            }
            EventKind::DispatcherIdle => {
                tracing::debug!(target: "docdispatch", seq = e.seq, category, "dispatch loop idle");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: "docdispatch", seq = e.seq, "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!(target: "docdispatch", seq = e.seq, "all jobs stopped within grace");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(target: "docdispatch", seq = e.seq, in_flight = e.in_flight, "grace exceeded");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "docdispatch", seq = e.seq, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(target: "docdispatch", seq = e.seq, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::requests::{Category, Priority, RequestId};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn fields_use_display_forms() {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let ev = Event::new(EventKind::RequestAdmitted)
            .with_category(Category::Conversion)
            .with_client("acme")
            .with_request(RequestId(7))
            .with_priority(Priority(4))
            .with_slots(2, 2);
        LogWriter::new().on_event(&ev).await;

        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("request=req-7"), "{text}");
        assert!(text.contains("priority=4"), "{text}");
        assert!(text.contains("budget=2"), "{text}");
        assert!(!text.contains("Some("), "{text}");
    }

    #[tokio::test]
    async fn renders_every_kind_without_panicking() {
        let w = LogWriter::new();
        for kind in [
            EventKind::RequestQueued,
            EventKind::RequestAdmitted,
            EventKind::AdmissionFaulted,
            EventKind::JobCompleted,
            EventKind::JobFailed,
            EventKind::JobPanicked,
            EventKind::SlotReleased,
            EventKind::DispatcherRunning,
            EventKind::DispatcherIdle,
            EventKind::ShutdownRequested,
            EventKind::AllStoppedWithin,
            EventKind::GraceExceeded,
            EventKind::SubscriberOverflow,
            EventKind::SubscriberPanicked,
        ] {
            let ev = Event::new(kind)
                .with_category(Category::Editor)
                .with_client("c")
                .with_request(RequestId(1));
            w.on_event(&ev).await;
        }
    }
}
