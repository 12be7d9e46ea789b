//! # Example: custom_subscriber
//!
//! Attach the built-in `LogWriter` next to a custom event subscriber.
//!
//! Shows how to:
//! - Implement the [`Subscribe`] trait.
//! - Inspect [`Event`] / [`EventKind`] for stream lifecycle metrics.
//! - Route [`LogWriter`] output through `tracing-subscriber`.
//!
//! ## Flow
//! ```text
//! add_stream / teardown ──► ControlLoop ──► Bus.publish(StreamAdded / StreamDrained / ...)
//!                                              │
//!                                   subscriber listener (until Stopped)
//!                                              │
//!                                  SubscriberSet.emit() ──┬─► LogWriter.on_event()   ──► tracing
//!                                                         └─► DrainStats.on_event()  ──► println!
//! ```
//!
//! ## Run
//! Requires the `logging` feature (on by default) to export [`LogWriter`].
//! ```bash
//! RUST_LOG=info cargo run --example custom_subscriber
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use serde_json::json;
use streamvisor::{
    Event, EventKind, LogWriter, PollExitResponse, Record, Request, Response, Subscribe,
    Supervisor, SupervisorConfig, WorkerContext, WorkerError, WorkerFn, WorkerRef,
};

/// Counts drained streams and the poll rounds they needed.
#[derive(Default)]
struct DrainStats {
    drained: AtomicU32,
    polls: AtomicU32,
}

#[async_trait::async_trait]
impl Subscribe for DrainStats {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::StreamDrained => {
                self.drained.fetch_add(1, Ordering::Relaxed);
                self.polls.fetch_add(ev.polls.unwrap_or(0), Ordering::Relaxed);
                println!(
                    "[stats] drained: stream={} polls={}",
                    ev.stream.as_deref().unwrap_or("<unknown>"),
                    ev.polls.unwrap_or(0)
                );
            }
            EventKind::SupervisorStopped => {
                println!(
                    "[stats] stopped: drained={} total_polls={}",
                    self.drained.load(Ordering::Relaxed),
                    self.polls.load(Ordering::Relaxed)
                );
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "drain-stats"
    }
}

/// Reports done on the `rounds`-th poll after `Exit`.
fn slow_finisher(rounds: u32) -> WorkerRef {
    WorkerFn::arc("slow-finisher", move |ctx: WorkerContext| async move {
        let mut polls_after_exit = 0;
        let mut exiting = false;
        while let Some(record) = ctx.next_record().await {
            match record {
                Record::Request { mailbox, request: Request::Status } => {
                    ctx.respond(mailbox, Response::Status)?
                }
                Record::Request { mailbox, request: Request::PollExit } => {
                    if exiting {
                        polls_after_exit += 1;
                    }
                    let done = exiting && polls_after_exit >= rounds;
                    ctx.respond(mailbox, Response::PollExit(PollExitResponse { done }))?
                }
                Record::Exit { .. } => exiting = true,
                Record::Data(_) => {}
                Record::Shutdown => break,
            }
        }
        Ok::<(), WorkerError>(())
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let stats = Arc::new(DrainStats::default());
    let cfg = SupervisorConfig {
        drain_poll_interval: Duration::from_millis(20),
        ..SupervisorConfig::default()
    };
    let sup = Supervisor::builder(cfg, slow_finisher(3))
        .with_subscribers(vec![
            Arc::new(LogWriter::new()) as Arc<dyn Subscribe>,
            stats.clone() as Arc<dyn Subscribe>,
        ])
        .build();

    for id in ["orders", "payments", "audit"] {
        sup.add_stream(id, json!({ "topic": id })).await?;
    }
    sup.teardown(0).await?;

    // Subscribers run on their own tasks; give them a moment to flush.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
