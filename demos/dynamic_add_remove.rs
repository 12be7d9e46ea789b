//! # Example: dynamic_add_remove
//!
//! Add and remove streams at runtime, then tear the supervisor down.
//!
//! Demonstrates how to:
//! - Build a `Supervisor` around one worker entry point.
//! - Add streams from several tasks at once; the control loop applies them in order.
//! - Feed a stream through its inbound queue and read its side channel.
//! - Remove a stream, then drain the rest with `teardown`.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► Supervisor::builder(cfg, echo).build()
//!   │     └─► ControlLoop::run() (background task)
//!   │
//!   ├─► add_stream("ingest-0" .. "ingest-2")   (from spawned tasks)
//!   ├─► inbound().put(Data) ──► echo ──► side_channel().get()
//!   ├─► remove_stream("ingest-1")
//!   └─► teardown(0)
//!         ├─► Exit{0} to every stream
//!         ├─► poll until every stream reports done
//!         └─► close all, state = Stopped
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example dynamic_add_remove
//! ```

use std::{sync::Arc, time::Duration};

use serde_json::json;
use streamvisor::{
    PollExitResponse, Record, Request, Response, Supervisor, SupervisorConfig, WorkerContext,
    WorkerError, WorkerFn, WorkerRef,
};

/// Echoes data back and finishes on the first poll after `Exit`.
fn echo() -> WorkerRef {
    WorkerFn::arc("echo", |ctx: WorkerContext| async move {
        let mut exiting = false;
        while let Some(record) = ctx.next_record().await {
            match record {
                Record::Request { mailbox, request: Request::Status } => {
                    ctx.respond(mailbox, Response::Status)?
                }
                Record::Request { mailbox, request: Request::PollExit } => {
                    ctx.respond(mailbox, Response::PollExit(PollExitResponse { done: exiting }))?
                }
                Record::Exit { code } => {
                    println!("[{}] exit requested (code {code})", ctx.stream_id);
                    exiting = true;
                }
                Record::Data(v) => ctx.emit(json!({ "stream": &*ctx.stream_id, "echo": v }))?,
                Record::Shutdown => break,
            }
        }
        println!("[{}] worker done", ctx.stream_id);
        Ok::<(), WorkerError>(())
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = SupervisorConfig {
        drain_poll_interval: Duration::from_millis(50),
        ..SupervisorConfig::default()
    };
    let sup = Supervisor::builder(cfg, echo()).build();

    let mut adds = Vec::new();
    for i in 0..3 {
        let sup = Arc::clone(&sup);
        adds.push(tokio::spawn(async move {
            sup.add_stream(format!("ingest-{i}"), json!({ "shard": i })).await
        }));
    }
    for add in adds {
        add.await??;
    }
    println!("streams: {:?}", sup.stream_ids().await);

    let ctx = sup.get_stream("ingest-0").await?;
    ctx.inbound()
        .put(Record::Data(json!({ "line": 1 })))
        .map_err(|_| "inbound queue closed")?;
    if let Some(v) = ctx.side_channel().get().await {
        println!("side channel: {v}");
    }

    // Removal assumes the stream has nothing left to finish.
    sup.remove_stream("ingest-1").await?;
    println!("after remove: {:?}", sup.stream_ids().await);

    sup.teardown(0).await?;
    println!("after teardown: {:?} ({:?})", sup.stream_ids().await, sup.state());
    Ok(())
}
