use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docdispatch::{
    Category, Config, Dispatcher, Event, EventKind, JobError, JobFn, JobRef, LaneStatus, Priority,
    RuntimeError, StaticPlans, SubmitError, TierTable,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

/// Job that reports `label` when it starts and then waits for its gate.
fn gated(
    label: &'static str,
    started: &mpsc::UnboundedSender<&'static str>,
) -> (JobRef, oneshot::Sender<()>) {
    let (gate_tx, gate_rx) = oneshot::channel::<()>();
    let started = started.clone();
    let job = JobFn::boxed(move |_ctx| async move {
        let _ = started.send(label);
        let _ = gate_rx.await;
        Ok::<_, JobError>(())
    });
    (job, gate_tx)
}

/// Job that reports `label` and finishes immediately.
fn instant(label: &'static str, started: &mpsc::UnboundedSender<&'static str>) -> JobRef {
    let started = started.clone();
    JobFn::boxed(move |_ctx| async move {
        let _ = started.send(label);
        Ok::<_, JobError>(())
    })
}

async fn next_started(rx: &mut mpsc::UnboundedReceiver<&'static str>) -> &'static str {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a job to start")
        .expect("started channel closed")
}

/// Lets spawned tasks run, then asserts nothing else started.
async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<&'static str>) {
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(rx.try_recv().is_err(), "unexpected job start");
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn wait_for(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    timeout(WAIT, async {
        loop {
            let ev = rx.recv().await.expect("event bus closed");
            if ev.kind == kind {
                return ev;
            }
        }
    })
    .await
    .expect("event not observed in time")
}

#[tokio::test]
async fn idle_category_starts_on_first_submission() {
    let d = Dispatcher::builder(Config::default()).build();
    assert_eq!(d.status(Category::Editor), LaneStatus::Idle);

    let (tx, mut rx) = mpsc::unbounded_channel();
    d.submit("c1", "editor", 1u32, instant("only", &tx)).unwrap();
    assert_eq!(d.status(Category::Editor), LaneStatus::Running);

    assert_eq!(next_started(&mut rx).await, "only");
    wait_until(|| d.status(Category::Editor) == LaneStatus::Idle).await;
    assert_eq!(d.in_flight("c1", Category::Editor), 0);

    // A later submission restarts the loop without any other trigger.
    d.submit("c1", "editor", 1u32, instant("again", &tx)).unwrap();
    assert_eq!(next_started(&mut rx).await, "again");
}

#[tokio::test]
async fn caps_are_per_client_not_global() {
    let tiers = TierTable::empty()
        .with_tier("tierA", 2)
        .with_tier("tierB", 1)
        .with_budget("tierB", Category::Conversion, 2);
    let plans = StaticPlans::new()
        .with_client("X", "tierA")
        .with_client("Y", "tierB");
    let d = Dispatcher::builder(Config {
        tiers,
        ..Config::default()
    })
    .with_plans(plans)
    .build();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (x1, x1_gate) = gated("x1", &tx);
    let (x2, x2_gate) = gated("x2", &tx);
    let (x3, _x3_gate) = gated("x3", &tx);
    let (y1, _y1_gate) = gated("y1", &tx);
    d.submit("X", "conversion", 2u32, x1).unwrap();
    d.submit("X", "conversion", 2u32, x2).unwrap();
    d.submit("X", "conversion", 2u32, x3).unwrap();
    d.submit("Y", "conversion", 1u32, y1).unwrap();

    // X's first and Y's only request start; Y is not stuck behind X's cap.
    assert_eq!(next_started(&mut rx).await, "x1");
    assert_eq!(next_started(&mut rx).await, "y1");
    assert_quiet(&mut rx).await;
    assert_eq!(d.in_flight("X", Category::Conversion), 1);
    assert_eq!(d.in_flight("Y", Category::Conversion), 1);

    let snap = &d.snapshot()[Category::Conversion as usize];
    assert_eq!(snap.pending, 2);
    assert_eq!(snap.in_flight, 2);
    assert_eq!(snap.head_priority, Some(Priority(2)));

    // One release lets exactly one more of X's requests in.
    x1_gate.send(()).unwrap();
    assert_eq!(next_started(&mut rx).await, "x2");
    assert_quiet(&mut rx).await;
    assert_eq!(d.in_flight("X", Category::Conversion), 1);

    x2_gate.send(()).unwrap();
    assert_eq!(next_started(&mut rx).await, "x3");
}

#[tokio::test]
async fn admission_follows_priority_then_arrival() {
    let d = Dispatcher::builder(Config::default()).build();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let (blocker, gate) = gated("blocker", &tx);
    d.submit("solo", "ai", 1u32, blocker).unwrap();
    assert_eq!(next_started(&mut rx).await, "blocker");

    let queued: [(&'static str, u32); 7] = [
        ("p1-a", 1),
        ("p3-a", 3),
        ("p2-a", 2),
        ("p3-b", 3),
        ("p4-a", 4),
        ("p1-b", 1),
        ("p2-b", 2),
    ];
    for (label, p) in queued {
        d.submit("solo", "ai", p, instant(label, &tx)).unwrap();
    }
    assert_quiet(&mut rx).await;

    gate.send(()).unwrap();
    let mut order = Vec::new();
    for _ in 0..queued.len() {
        order.push(next_started(&mut rx).await);
    }
    assert_eq!(
        order,
        vec!["p4-a", "p3-a", "p3-b", "p2-a", "p2-b", "p1-a", "p1-b"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_never_exceeds_budget() {
    let plans = StaticPlans::new()
        .with_client("deluxe", "deluxe")
        .with_client("premium", "premium")
        .with_client("free", "free");
    let d = Dispatcher::builder(Config::default()).with_plans(plans).build();

    let running: Arc<Mutex<HashMap<&'static str, usize>>> = Arc::default();
    let peak: Arc<Mutex<HashMap<&'static str, usize>>> = Arc::default();
    let done = Arc::new(AtomicUsize::new(0));

    let clients = ["deluxe", "premium", "free"];
    let per_client = 15;
    for i in 0..per_client {
        for client in clients {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let done = Arc::clone(&done);
            let job = JobFn::boxed(move |_ctx| async move {
                {
                    let mut r = running.lock().unwrap();
                    let n = r.entry(client).or_default();
                    *n += 1;
                    let mut p = peak.lock().unwrap();
                    let m = p.entry(client).or_default();
                    *m = (*m).max(*n);
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
                *running.lock().unwrap().get_mut(client).unwrap() -= 1;
                done.fetch_add(1, Ordering::SeqCst);
                Ok::<_, JobError>(())
            });
            d.submit(client, "conversion", (i % 4) as u32, job).unwrap();
        }
    }

    let total = per_client * clients.len();
    wait_until(|| done.load(Ordering::SeqCst) == total).await;

    let peak = peak.lock().unwrap();
    for client in clients {
        let budget = d.budget(client, Category::Conversion);
        assert!(
            peak[client] <= budget,
            "{client}: peak {} exceeds budget {budget}",
            peak[client]
        );
    }
    assert_eq!(d.budget("deluxe", Category::Conversion), 2);
    wait_until(|| d.total_in_flight(Category::Conversion) == 0).await;
}

#[tokio::test]
async fn unknown_category_is_rejected_synchronously() {
    let d = Dispatcher::builder(Config::default()).build();
    let ran = Arc::new(AtomicUsize::new(0));
    let flag = Arc::clone(&ran);
    let job = JobFn::boxed(move |_ctx| async move {
        flag.fetch_add(1, Ordering::SeqCst);
        Ok::<_, JobError>(())
    });

    let err = d.submit("c", "watermark", 1u32, job).unwrap_err();
    assert_eq!(
        err,
        SubmitError::InvalidCategory {
            name: "watermark".into()
        }
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    for snap in d.snapshot() {
        assert_eq!(snap.pending, 0);
        assert_eq!(snap.status, LaneStatus::Idle);
    }
}

#[tokio::test]
async fn failed_and_panicking_jobs_release_their_slot() {
    let d = Dispatcher::builder(Config::default()).build();
    let mut events = d.events();
    let (tx, mut rx) = mpsc::unbounded_channel();

    d.submit(
        "c",
        "conversion",
        3u32,
        JobFn::boxed(|_ctx| async {
            Err::<(), _>(JobError::Fail {
                error: "corrupt pdf".into(),
            })
        }),
    )
    .unwrap();
    d.submit(
        "c",
        "conversion",
        2u32,
        JobFn::boxed(|_ctx| async {
            if std::hint::black_box(true) {
                panic!("converter crashed");
            }
            Ok::<_, JobError>(())
        }),
    )
    .unwrap();
    d.submit("c", "conversion", 1u32, instant("last", &tx)).unwrap();

    let failed = wait_for(&mut events, EventKind::JobFailed).await;
    assert!(failed.reason.as_deref().unwrap().contains("corrupt pdf"));
    let panicked = wait_for(&mut events, EventKind::JobPanicked).await;
    assert!(panicked.reason.as_deref().unwrap().contains("converter crashed"));

    assert_eq!(next_started(&mut rx).await, "last");
    wait_until(|| d.in_flight("c", Category::Conversion) == 0).await;
}

#[tokio::test]
async fn admission_fault_is_isolated_to_its_request() {
    let plans = |client: &str| -> Option<String> {
        if client == "broken" {
            panic!("plan store unavailable");
        }
        Some("free".to_string())
    };
    let d = Dispatcher::builder(Config::default()).with_plans(plans).build();
    let mut events = d.events();
    let (tx, mut rx) = mpsc::unbounded_channel();

    d.submit("broken", "editor", 9u32, instant("broken", &tx)).unwrap();
    d.submit("healthy", "editor", 1u32, instant("healthy", &tx)).unwrap();

    let fault = wait_for(&mut events, EventKind::AdmissionFaulted).await;
    assert_eq!(fault.client.as_deref(), Some("broken"));
    assert_eq!(next_started(&mut rx).await, "healthy");
    assert_quiet(&mut rx).await;
    wait_until(|| d.status(Category::Editor) == LaneStatus::Idle).await;
}

#[tokio::test]
async fn categories_do_not_share_budgets() {
    let d = Dispatcher::builder(Config::default()).build();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let (conv, _g1) = gated("conversion", &tx);
    let (edit, _g2) = gated("editor", &tx);
    let (ai, _g3) = gated("ai", &tx);
    d.submit_to("c", Category::Conversion, 1u32, conv).unwrap();
    d.submit_to("c", Category::Editor, 1u32, edit).unwrap();
    d.submit_to("c", Category::Ai, 1u32, ai).unwrap();

    let mut started = vec![
        next_started(&mut rx).await,
        next_started(&mut rx).await,
        next_started(&mut rx).await,
    ];
    started.sort_unstable();
    assert_eq!(started, vec!["ai", "conversion", "editor"]);
}

#[tokio::test]
async fn plan_tier_drives_priority() {
    let plans = StaticPlans::new()
        .with_client("d", "Deluxe")
        .with_client("s", "standard");
    let d = Dispatcher::builder(Config::default()).with_plans(plans).build();
    assert_eq!(d.priority_for("d"), Priority(4));
    assert_eq!(d.priority_for("s"), Priority(2));
    assert_eq!(d.priority_for("nobody"), Priority(1));

    let mut events = d.events();
    let (tx, _rx) = mpsc::unbounded_channel();
    d.submit_for_plan("d", "conversion", instant("d", &tx)).unwrap();
    let queued = wait_for(&mut events, EventKind::RequestQueued).await;
    assert_eq!(queued.priority, Some(Priority(4)));

    let err = d.submit_for_plan("d", "print", instant("x", &tx)).unwrap_err();
    assert_eq!(err.as_label(), "submit_invalid_category");
}

#[tokio::test]
async fn shutdown_drops_pending_and_cancels_running() {
    let d = Dispatcher::builder(Config::default()).build();
    let mut events = d.events();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let started = tx.clone();
    d.submit(
        "c",
        "ai",
        1u32,
        JobFn::boxed(move |ctx| async move {
            let _ = started.send("running");
            ctx.cancelled().await;
            Err::<(), _>(JobError::Canceled)
        }),
    )
    .unwrap();
    assert_eq!(next_started(&mut rx).await, "running");
    d.submit("c", "ai", 1u32, instant("pending", &tx)).unwrap();

    d.shutdown().await.unwrap();
    assert!(d.is_closed());
    wait_for(&mut events, EventKind::AllStoppedWithin).await;
    assert!(rx.try_recv().is_err(), "pending job must not run");
    assert_eq!(d.snapshot()[Category::Ai as usize].pending, 0);

    let err = d.submit("c", "ai", 1u32, instant("late", &tx)).unwrap_err();
    assert_eq!(err, SubmitError::Closed);
}

#[tokio::test]
async fn shutdown_reports_jobs_exceeding_grace() {
    let d = Dispatcher::builder(Config {
        grace: Duration::from_millis(20),
        ..Config::default()
    })
    .build();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let started = tx.clone();
    d.submit(
        "c",
        "editor",
        1u32,
        JobFn::boxed(move |_ctx| async move {
            let _ = started.send("stubborn");
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, JobError>(())
        }),
    )
    .unwrap();
    assert_eq!(next_started(&mut rx).await, "stubborn");

    match d.shutdown().await {
        Err(RuntimeError::GraceExceeded { in_flight, .. }) => assert_eq!(in_flight, 1),
        other => panic!("expected GraceExceeded, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn submit_works_from_threads_outside_the_runtime() {
    let d = Dispatcher::builder(Config::default()).build();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let job = instant("from-thread", &tx);
    let remote = Arc::clone(&d);
    let submitted = std::thread::spawn(move || remote.submit("c", "ai", 1u32, job))
        .join()
        .expect("submitting thread panicked");
    assert!(submitted.is_ok());

    assert_eq!(next_started(&mut rx).await, "from-thread");
    wait_until(|| d.status(Category::Ai) == LaneStatus::Idle).await;

    // The category keeps working for in-runtime submissions too.
    d.submit("c", "ai", 1u32, instant("after", &tx)).unwrap();
    assert_eq!(next_started(&mut rx).await, "after");
}

#[tokio::test]
async fn finishing_job_frees_capacity_and_wakes_the_loop() {
    let d = Dispatcher::builder(Config::default()).build();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let (holder, gate) = gated("holder", &tx);
    d.submit("x", "ai", 1u32, holder).unwrap();
    assert_eq!(next_started(&mut rx).await, "holder");
    d.submit("x", "ai", 1u32, instant("waiting", &tx)).unwrap();
    assert_quiet(&mut rx).await;

    assert_eq!(d.in_flight("x", Category::Ai), 1);
    assert_eq!(d.total_in_flight(Category::Ai), 1);
    assert_eq!(d.snapshot()[Category::Ai as usize].pending, 1);

    gate.send(()).unwrap();
    assert_eq!(next_started(&mut rx).await, "waiting");
    wait_until(|| d.total_in_flight(Category::Ai) == 0).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_waits_for_every_admitted_job() {
    let d = Dispatcher::builder(Config::default()).build();
    let mut events = d.events();
    let finished = Arc::new(AtomicUsize::new(0));

    for i in 0..48 {
        let finished = Arc::clone(&finished);
        let job = JobFn::boxed(move |ctx| async move {
            tokio::select! {
                _ = ctx.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_millis(5)) => {}
            }
            finished.fetch_add(1, Ordering::SeqCst);
            Ok::<_, JobError>(())
        });
        let category = Category::ALL[i % Category::ALL.len()];
        d.submit_to(format!("client-{i}"), category, 1u32, job).unwrap();
    }
    tokio::task::yield_now().await;

    d.shutdown().await.unwrap();
    let finished_at_shutdown = finished.load(Ordering::SeqCst);

    let mut admitted = 0;
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::RequestAdmitted {
            admitted += 1;
        }
    }
    assert_eq!(finished_at_shutdown, admitted);
}
