//! # streamvisor
//!
//! **Streamvisor** supervises many concurrently running work streams from one
//! serialized control plane.
//!
//! Each stream is a worker task plus three queues: an inbound queue carrying
//! commands and data to the worker, an outbound queue carrying its replies, and
//! a side channel where worker output is relayed to the caller. Callers add,
//! remove and disown streams from any task; the supervisor applies those
//! actions strictly one at a time, tears every stream down with a coordinated
//! drain protocol, and stops itself if its owner process disappears.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller tasks ── add_stream / remove_stream / disown_stream / teardown
//!                                     │
//!                                     ▼
//!                          [action queue (FIFO)]
//!                                     │
//! ┌───────────────────────────────────▼───────────────────────────────┐
//! │  ControlLoop (one task)                                           │
//! │  - orphan check (throttled, owner pid)                            │
//! │  - dispatch: create/start, close, detach, drain                   │
//! │  - Registry (id → StreamContext), sole writer                     │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   StreamContext      StreamContext      StreamContext
//!   ├ inbound  ─► worker task ─► outbound ─► Relay router
//!   │                                          ├─ replies → pending mailboxes
//!   │                                          ├─ ExitComplete → exit notice
//!   │                                          └─ Data → side channel
//!   └ Relay: status / exit / poll-exit / detach
//!
//!   ControlLoop, drain, workers ── publish(Event) ──► Bus ──► SubscriberSet ──► LogWriter, ...
//! ```
//!
//! ### Teardown
//! ```text
//! teardown(code)
//!   ├─► state = Stopping
//!   ├─► snapshot registry
//!   ├─► publish Exit{code} to every stream
//!   ├─► loop: poll every pending stream concurrently
//!   │        ├─ done ─► drop from pending
//!   │        └─ wait drain_poll_interval, or less if a worker pushes ExitComplete
//!   ├─► close every stream in parallel
//!   ├─► clear registry
//!   └─► state = Stopped ─► completion fires
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                       |
//! |-------------------|-----------------------------------------------------------|------------------------------------------|
//! | **Supervision**   | Serialized lifecycle of many streams.                     | [`Supervisor`], [`SupervisorState`]      |
//! | **Workers**       | Stream entry points, as trait objects or closures.        | [`Worker`], [`WorkerFn`], [`WorkerRef`]  |
//! | **Control**       | Request/response interface to a running worker.           | [`Relay`], [`Record`], [`WorkerMessage`] |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).    | [`Subscribe`], [`Event`]                 |
//! | **Errors**        | Typed errors for actions and workers.                     | [`StreamError`], [`WorkerError`]         |
//! | **Configuration** | Intervals, orphan policy, startup bound.                  | [`SupervisorConfig`], [`OrphanPolicy`]   |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a `tracing`-backed subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use serde_json::json;
//! use streamvisor::{
//!     PollExitResponse, Record, Request, Response, Supervisor, SupervisorConfig,
//!     SupervisorState, WorkerContext, WorkerFn, WorkerRef,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = SupervisorConfig::default();
//!     cfg.drain_poll_interval = Duration::from_millis(10);
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn streamvisor::Subscribe>> = vec![Arc::new(streamvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn streamvisor::Subscribe>> = Vec::new();
//!
//!     // A worker that echoes data and finishes as soon as it is told to exit.
//!     let echo: WorkerRef = WorkerFn::arc("echo", |ctx: WorkerContext| async move {
//!         let mut exiting = false;
//!         while let Some(record) = ctx.next_record().await {
//!             match record {
//!                 Record::Request { mailbox, request: Request::Status } => {
//!                     ctx.respond(mailbox, Response::Status)?
//!                 }
//!                 Record::Request { mailbox, request: Request::PollExit } => {
//!                     ctx.respond(mailbox, Response::PollExit(PollExitResponse { done: exiting }))?
//!                 }
//!                 Record::Exit { .. } => exiting = true,
//!                 Record::Data(v) => ctx.emit(v)?,
//!                 Record::Shutdown => break,
//!             }
//!         }
//!         Ok::<(), streamvisor::WorkerError>(())
//!     });
//!
//!     let sup = Supervisor::builder(cfg, echo).with_subscribers(subs).build();
//!     sup.add_stream("run-1", json!({"project": "demo"})).await?;
//!
//!     let stream = sup.get_stream("run-1").await?;
//!     stream.inbound().put(Record::Data(json!({"line": 1}))).ok();
//!     assert_eq!(stream.side_channel().get().await, Some(json!({"line": 1})));
//!
//!     sup.teardown(0).await?;
//!     assert_eq!(sup.state(), SupervisorState::Stopped);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod stream;
mod subscribers;

// ---- Public re-exports ----

pub use core::{OrphanPolicy, Registry, Supervisor, SupervisorBuilder, SupervisorConfig, SupervisorState};
pub use error::{StreamError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use stream::{
    Launch, Mailbox, PollExitResponse, Queue, Record, Relay, Request, Response, StreamContext,
    StreamSettings, Worker, WorkerContext, WorkerFn, WorkerHandle, WorkerMessage, WorkerRef,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: a `tracing`-backed logger subscriber.
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
