//! # Example: tiers
//!
//! Three clients on different plans submit a burst of conversions.
//!
//! Shows how to:
//! - Map clients to plan tiers with [`StaticPlans`].
//! - Submit with [`Dispatcher::submit_for_plan`] so the tier decides priority.
//! - Watch admission through the [`LogWriter`] subscriber.
//!
//! ## Flow
//! ```text
//! submit_for_plan ──► Lane[conversion] (priority, arrival)
//!     ├─► deluxe client:   up to 2 conversions at once
//!     ├─► premium client:  1 at a time, admitted before standard
//!     └─► standard client: 1 at a time
//! events ──► LogWriter ──► tracing_subscriber::fmt
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=docdispatch=debug cargo run --example tiers --features logging
//! ```

use std::{sync::Arc, time::Duration};

use docdispatch::{Config, Dispatcher, JobError, JobFn, LogWriter, StaticPlans, Subscribe};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

fn convert(client: &'static str, n: usize, done: mpsc::UnboundedSender<String>) -> docdispatch::JobRef {
    JobFn::boxed(move |ctx| async move {
        tokio::select! {
            _ = ctx.cancelled() => return Err(JobError::Canceled),
            _ = tokio::time::sleep(Duration::from_millis(150)) => {}
        }
        let _ = done.send(format!("{client}/doc-{n}.pdf"));
        Ok(())
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docdispatch=info")),
        )
        .init();

    let plans = StaticPlans::new()
        .with_client("acme", "deluxe")
        .with_client("globex", "premium")
        .with_client("initech", "standard");
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let dispatcher = Dispatcher::builder(Config::default())
        .with_plans(plans)
        .with_subscribers(subs)
        .build();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut submitted = 0;
    for n in 0..3 {
        for client in ["initech", "globex", "acme"] {
            dispatcher.submit_for_plan(client, "conversion", convert(client, n, tx.clone()))?;
            submitted += 1;
        }
    }
    drop(tx);

    for _ in 0..submitted {
        if let Some(file) = rx.recv().await {
            println!("converted {file}");
        }
    }

    for snap in dispatcher.snapshot() {
        println!(
            "{:<10} status={:?} pending={} in_flight={}",
            snap.category, snap.status, snap.pending, snap.in_flight
        );
    }

    dispatcher.shutdown().await?;
    Ok(())
}
