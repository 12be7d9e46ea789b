use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use streamvisor::{
    EventKind, OrphanPolicy, PollExitResponse, Record, Request, Response, StreamError, Supervisor,
    SupervisorConfig, SupervisorState, Worker, WorkerContext, WorkerError, WorkerFn, WorkerRef,
};

/// Exit codes each stream received, keyed by stream id.
type ExitLog = Arc<Mutex<HashMap<String, i32>>>;

/// Answers status at once and reports done on the `k`-th poll after `Exit`.
struct Finisher {
    k: u32,
    exits: ExitLog,
}

impl Finisher {
    fn arc(k: u32) -> (WorkerRef, ExitLog) {
        let exits = ExitLog::default();
        let worker = Arc::new(Self {
            k,
            exits: Arc::clone(&exits),
        });
        (worker, exits)
    }
}

#[async_trait]
impl Worker for Finisher {
    fn name(&self) -> &str {
        "finisher"
    }

    async fn run(&self, ctx: WorkerContext) -> Result<(), WorkerError> {
        let mut polls_after_exit = 0;
        let mut exiting = false;
        while let Some(record) = ctx.next_record().await {
            match record {
                Record::Request {
                    mailbox,
                    request: Request::Status,
                } => ctx.respond(mailbox, Response::Status)?,
                Record::Request {
                    mailbox,
                    request: Request::PollExit,
                } => {
                    if exiting {
                        polls_after_exit += 1;
                    }
                    let done = exiting && polls_after_exit >= self.k;
                    ctx.respond(mailbox, Response::PollExit(PollExitResponse { done }))?;
                }
                Record::Exit { code } => {
                    exiting = true;
                    self.exits
                        .lock()
                        .unwrap()
                        .insert(ctx.stream_id.to_string(), code);
                }
                Record::Data(value) => ctx.emit(value)?,
                Record::Shutdown => break,
            }
        }
        Ok(())
    }
}

fn fast_config() -> SupervisorConfig {
    SupervisorConfig {
        orphan_check_interval: Duration::from_millis(50),
        action_timeout: Duration::from_millis(20),
        drain_poll_interval: Duration::from_millis(10),
        ..SupervisorConfig::default()
    }
}

/// Pid of a process that has already exited and been reaped.
fn dead_pid() -> u32 {
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let pid = child.id();
    child.wait().unwrap();
    pid
}

#[tokio::test]
async fn add_makes_stream_visible_with_its_settings() {
    let (worker, _) = Finisher::arc(1);
    let sup = Supervisor::builder(fast_config(), worker).build();

    sup.add_stream("a", json!({"project": "p1"})).await.unwrap();

    assert_eq!(sup.stream_ids().await, vec!["a"]);
    assert!(sup.has_stream("a").await);
    let ctx = sup.get_stream("a").await.unwrap();
    assert_eq!(ctx.settings().get("project"), Some(&json!("p1")));
    assert_eq!(sup.state(), SupervisorState::Running);

    sup.teardown(0).await.unwrap();
}

#[tokio::test]
async fn duplicate_add_fails_and_keeps_first_settings() {
    let (worker, _) = Finisher::arc(1);
    let sup = Supervisor::builder(fast_config(), worker).build();

    sup.add_stream("a", json!({"v": 1})).await.unwrap();
    let err = sup.add_stream("a", json!({"v": 2})).await.unwrap_err();

    assert_eq!(err, StreamError::DuplicateStream { id: "a".into() });
    assert_eq!(sup.stream_ids().await, vec!["a"]);
    let ctx = sup.get_stream("a").await.unwrap();
    assert_eq!(ctx.settings().get("v"), Some(&json!(1)));

    sup.teardown(0).await.unwrap();
}

#[tokio::test]
async fn remove_unknown_fails_and_remove_known_unregisters() {
    let (worker, _) = Finisher::arc(1);
    let sup = Supervisor::builder(fast_config(), worker).build();

    let err = sup.remove_stream("ghost").await.unwrap_err();
    assert_eq!(err, StreamError::UnknownStream { id: "ghost".into() });

    sup.add_stream("a", json!({})).await.unwrap();
    let ctx = sup.get_stream("a").await.unwrap();
    sup.remove_stream("a").await.unwrap();

    assert!(!sup.has_stream("a").await);
    assert!(ctx.is_finished());
    assert!(matches!(
        sup.get_stream("a").await,
        Err(StreamError::UnknownStream { .. })
    ));

    sup.teardown(0).await.unwrap();
}

#[tokio::test]
async fn lifecycle_actions_apply_in_submission_order() {
    let (worker, _) = Finisher::arc(1);
    let sup = Supervisor::builder(fast_config(), worker).build();

    sup.add_stream("a", json!({})).await.unwrap();
    sup.remove_stream("a").await.unwrap();
    sup.add_stream("a", json!({"again": true})).await.unwrap();

    assert_eq!(sup.stream_ids().await, vec!["a"]);
    let ctx = sup.get_stream("a").await.unwrap();
    assert_eq!(ctx.settings().get("again"), Some(&json!(true)));

    sup.teardown(0).await.unwrap();
}

#[tokio::test]
async fn disown_unregisters_and_discards_results() {
    let (worker, _) = Finisher::arc(1);
    let sup = Supervisor::builder(fast_config(), worker).build();
    let mut events = sup.subscribe();

    sup.add_stream("a", json!({})).await.unwrap();
    let ctx = sup.get_stream("a").await.unwrap();
    sup.disown_stream("a").await.unwrap();

    assert!(!sup.has_stream("a").await);
    assert!(ctx.interface().is_detached());
    assert!(ctx.side_channel().is_closed());

    let mut kinds = Vec::new();
    while let Ok(ev) = events.try_recv() {
        kinds.push(ev.kind);
    }
    assert!(kinds.contains(&EventKind::StreamDisowned));

    let err = sup.disown_stream("a").await.unwrap_err();
    assert_eq!(err, StreamError::UnknownStream { id: "a".into() });

    sup.teardown(0).await.unwrap();
}

#[tokio::test]
async fn teardown_without_streams_stops() {
    let (worker, _) = Finisher::arc(1);
    let sup = Supervisor::builder(fast_config(), worker).build();

    sup.teardown(0).await.unwrap();

    assert_eq!(sup.state(), SupervisorState::Stopped);
    assert!(sup.stream_ids().await.is_empty());
}

#[tokio::test]
async fn teardown_delivers_exit_code_to_every_stream() {
    let (worker, exits) = Finisher::arc(2);
    let sup = Supervisor::builder(fast_config(), worker).build();

    for id in ["a", "b", "c"] {
        sup.add_stream(id, json!({})).await.unwrap();
    }
    sup.teardown(7).await.unwrap();

    assert_eq!(sup.state(), SupervisorState::Stopped);
    assert!(sup.stream_ids().await.is_empty());
    let exits = exits.lock().unwrap();
    assert_eq!(exits.len(), 3);
    assert!(exits.values().all(|code| *code == 7));
}

#[tokio::test(start_paused = true)]
async fn teardown_duration_follows_poll_interval() {
    let (worker, _) = Finisher::arc(3);
    let cfg = SupervisorConfig {
        drain_poll_interval: Duration::from_millis(100),
        ..fast_config()
    };
    let sup = Supervisor::builder(cfg, worker).build();
    for i in 0..5 {
        sup.add_stream(format!("s{i}"), json!({})).await.unwrap();
    }

    let started = tokio::time::Instant::now();
    sup.teardown(0).await.unwrap();
    let elapsed = started.elapsed();

    // Three polls per stream, batched: two waits regardless of stream count.
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "{elapsed:?}");
}

#[tokio::test]
async fn actions_after_teardown_are_rejected() {
    let (worker, _) = Finisher::arc(1);
    let sup = Supervisor::builder(fast_config(), worker).build();

    sup.teardown(0).await.unwrap();

    assert_eq!(
        sup.add_stream("late", json!({})).await,
        Err(StreamError::SupervisorStopped)
    );
    assert_eq!(
        sup.remove_stream("late").await,
        Err(StreamError::SupervisorStopped)
    );
    sup.teardown(0).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_all_register() {
    let (worker, _) = Finisher::arc(1);
    let sup = Supervisor::builder(fast_config(), worker).build();

    let mut tasks = Vec::new();
    for i in 0..20 {
        let sup = Arc::clone(&sup);
        tasks.push(tokio::spawn(async move {
            sup.add_stream(format!("s{i:02}"), json!({ "i": i })).await
        }));
    }
    for t in tasks {
        t.await.unwrap().unwrap();
    }

    let ids = sup.stream_ids().await;
    assert_eq!(ids.len(), 20);
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    sup.teardown(0).await.unwrap();
    assert!(sup.stream_ids().await.is_empty());
}

#[tokio::test]
async fn worker_failing_at_startup_is_not_registered() {
    let worker = WorkerFn::arc("broken", |_ctx: WorkerContext| async {
        Err(WorkerError::Fatal {
            error: "no credentials".into(),
        })
    });
    let sup = Supervisor::builder(fast_config(), worker).build();

    let err = sup.add_stream("a", json!({})).await.unwrap_err();
    assert!(matches!(err, StreamError::WorkerStartupFailed { .. }), "{err:?}");
    assert!(!sup.has_stream("a").await);

    sup.teardown(0).await.unwrap();
}

#[tokio::test]
async fn silent_worker_hits_startup_timeout() {
    let worker = WorkerFn::arc("silent", |ctx: WorkerContext| async move {
        while let Some(record) = ctx.next_record().await {
            if record == Record::Shutdown {
                break;
            }
        }
        Ok(())
    });
    let cfg = SupervisorConfig {
        startup_timeout: Duration::from_millis(50),
        ..fast_config()
    };
    let sup = Supervisor::builder(cfg, worker).build();

    let err = sup.add_stream("a", json!({})).await.unwrap_err();
    assert!(matches!(err, StreamError::WorkerStartupTimeout { .. }), "{err:?}");
    assert!(sup.stream_ids().await.is_empty());

    sup.teardown(0).await.unwrap();
}

#[tokio::test]
async fn data_round_trips_through_side_channel() {
    let (worker, _) = Finisher::arc(1);
    let sup = Supervisor::builder(fast_config(), worker).build();

    sup.add_stream("a", json!({})).await.unwrap();
    let ctx = sup.get_stream("a").await.unwrap();
    ctx.inbound().put(Record::Data(json!({"line": 1}))).unwrap();

    let got = tokio::time::timeout(Duration::from_secs(1), ctx.side_channel().get())
        .await
        .unwrap();
    assert_eq!(got, Some(json!({"line": 1})));

    sup.teardown(0).await.unwrap();
}

#[tokio::test]
async fn lost_owner_abandons_streams_and_stops() {
    let (worker, exits) = Finisher::arc(1);
    let cfg = fast_config();
    let bound = cfg.orphan_check_interval + cfg.action_timeout;
    let sup = Supervisor::builder(cfg, worker).build();
    let mut events = sup.subscribe();

    sup.add_stream("a", json!({})).await.unwrap();
    sup.set_owner_pid(dead_pid());

    tokio::time::timeout(bound * 10, sup.wait_stopped())
        .await
        .unwrap();

    assert_eq!(sup.state(), SupervisorState::Stopped);
    assert!(sup.stream_ids().await.is_empty());
    assert!(exits.lock().unwrap().is_empty(), "abandoned streams get no exit");
    assert_eq!(
        sup.add_stream("b", json!({})).await,
        Err(StreamError::SupervisorStopped)
    );

    let mut saw_orphan = false;
    while let Ok(ev) = events.try_recv() {
        saw_orphan |= ev.kind == EventKind::OrphanDetected;
    }
    assert!(saw_orphan);
}

#[tokio::test]
async fn lost_owner_with_drain_policy_finishes_streams() {
    let (worker, exits) = Finisher::arc(1);
    let cfg = SupervisorConfig {
        orphan_policy: OrphanPolicy::Drain,
        orphan_exit_code: 3,
        ..fast_config()
    };
    let sup = Supervisor::builder(cfg, worker).build();

    sup.add_stream("a", json!({})).await.unwrap();
    sup.set_owner_pid(dead_pid());

    tokio::time::timeout(Duration::from_secs(2), sup.wait_stopped())
        .await
        .unwrap();

    assert!(sup.stream_ids().await.is_empty());
    assert_eq!(exits.lock().unwrap().get("a"), Some(&3));
}

#[tokio::test]
async fn live_owner_keeps_supervisor_running() {
    let (worker, _) = Finisher::arc(1);
    let sup = Supervisor::builder(fast_config(), worker)
        .with_owner_pid(std::process::id())
        .build();

    sup.add_stream("a", json!({})).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(sup.state(), SupervisorState::Running);
    assert!(sup.has_stream("a").await);
    sup.teardown(0).await.unwrap();
}

#[tokio::test]
async fn port_set_at_runtime_reaches_streams_added_later() {
    let seen: Arc<Mutex<Vec<Option<u16>>>> = Arc::default();
    let ports = Arc::clone(&seen);
    let worker = WorkerFn::arc("port", move |ctx: WorkerContext| {
        ports.lock().unwrap().push(ctx.port);
        async move {
            while let Some(record) = ctx.next_record().await {
                match record {
                    Record::Request {
                        mailbox,
                        request: Request::Status,
                    } => ctx.respond(mailbox, Response::Status)?,
                    Record::Shutdown => break,
                    _ => {}
                }
            }
            Ok::<(), WorkerError>(())
        }
    });
    let sup = Supervisor::builder(fast_config(), worker).with_port(8000).build();

    sup.add_stream("a", json!({})).await.unwrap();
    sup.set_port(9000);
    sup.add_stream("b", json!({})).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![Some(8000), Some(9000)]);
    sup.remove_stream("a").await.unwrap();
    sup.remove_stream("b").await.unwrap();
    sup.teardown(0).await.unwrap();
}

#[cfg(feature = "logging")]
#[tokio::test]
async fn log_writer_renders_lifecycle_events() {
    use streamvisor::{LogWriter, Subscribe};

    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("streamvisor=debug"))
        .with_test_writer()
        .try_init();

    let (worker, _) = Finisher::arc(1);
    let sup = Supervisor::builder(fast_config(), worker)
        .with_subscribers(vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>])
        .build();
    assert_eq!(sup.subscriber_count(), 1);

    sup.add_stream("a", json!({})).await.unwrap();
    sup.teardown(0).await.unwrap();
    assert_eq!(sup.state(), SupervisorState::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_adds_and_removes_leave_exactly_the_survivors() {
    let (worker, _) = Finisher::arc(1);
    let sup = Supervisor::builder(fast_config(), worker).build();

    let mut tasks = Vec::new();
    for i in 0..30 {
        let sup = Arc::clone(&sup);
        tasks.push(tokio::spawn(async move {
            let id = format!("s{i}");
            sup.add_stream(id.as_str(), json!({ "i": i })).await?;
            if i % 2 == 0 {
                sup.remove_stream(id.as_str()).await?;
            }
            Ok::<(), StreamError>(())
        }));
    }
    for t in tasks {
        t.await.unwrap().unwrap();
    }

    let mut expected: Vec<String> = (0..30).filter(|i| i % 2 == 1).map(|i| format!("s{i}")).collect();
    expected.sort();
    assert_eq!(sup.stream_ids().await, expected);
    assert_eq!(expected.len(), 15);

    sup.teardown(0).await.unwrap();
    assert!(sup.stream_ids().await.is_empty());
}

#[tokio::test]
async fn teardown_and_drop_release_every_background_task() {
    use streamvisor::{Event, Subscribe};

    struct Kinds(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Kinds {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "kinds"
        }
    }

    let metrics = tokio::runtime::Handle::current().metrics();
    let before = metrics.num_alive_tasks();

    let kinds = Arc::new(Kinds(Mutex::new(Vec::new())));
    let (worker, _) = Finisher::arc(1);
    let sup = Supervisor::builder(fast_config(), worker)
        .with_subscribers(vec![kinds.clone() as Arc<dyn Subscribe>])
        .build();
    sup.add_stream("a", json!({})).await.unwrap();
    sup.teardown(0).await.unwrap();
    drop(sup);

    for _ in 0..200 {
        if metrics.num_alive_tasks() == before {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(metrics.num_alive_tasks(), before);

    let kinds = kinds.0.lock().unwrap();
    assert!(kinds.contains(&EventKind::StreamAdded));
    assert_eq!(kinds.last(), Some(&EventKind::SupervisorStopped));
}
