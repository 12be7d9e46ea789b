//! # Worker entry point and the handle owning its execution unit.
//!
//! A [`Worker`] is the opaque entry point bound to one stream. It receives a
//! [`WorkerContext`] (settings blob, inbound/outbound queues, optional port and
//! owner pid) and must:
//! - answer `Request::Status` promptly (startup probe);
//! - on `Record::Exit`, finish its work and eventually answer
//!   `Request::PollExit` with `done = true`;
//! - return shortly after `Record::Shutdown` (or when the inbound queue closes).
//!
//! [`WorkerHandle`] wraps the tokio task running the entry point:
//! `spawn` → (probe, done by the context) → `join`. Never reused.

use std::borrow::Cow;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::WorkerError;
use crate::events::{Bus, Event, EventKind};

use super::queue::Queue;
use super::record::{Mailbox, Record, Response, WorkerMessage};
use super::settings::StreamSettings;

/// Everything a worker entry point is invoked with.
pub struct WorkerContext {
    /// Id of the stream this worker serves.
    pub stream_id: Arc<str>,
    /// Opaque settings blob passed to `add`.
    pub settings: StreamSettings,
    /// Inbound queue (records from the control interface and callers).
    pub records: Queue<Record>,
    /// Outbound queue (responses and results).
    pub results: Queue<WorkerMessage>,
    /// Listening port of the hosting process, if any.
    pub port: Option<u16>,
    /// Owner process id, if any.
    pub owner_pid: Option<u32>,
}

impl WorkerContext {
    /// Waits for the next inbound record; `None` once the inbound queue is closed.
    pub async fn next_record(&self) -> Option<Record> {
        self.records.get().await
    }

    /// Answers a request.
    pub fn respond(&self, mailbox: Mailbox, response: Response) -> Result<(), WorkerError> {
        self.results
            .put(WorkerMessage::Response { mailbox, response })
            .map_err(|_| WorkerError::Canceled)
    }

    /// Publishes a result for consumers of the stream.
    pub fn emit(&self, value: Value) -> Result<(), WorkerError> {
        self.results
            .put(WorkerMessage::Data(value))
            .map_err(|_| WorkerError::Canceled)
    }

    /// Proactively tells the supervisor that the finish sequence completed.
    pub fn notify_exit_complete(&self) {
        let _ = self.results.put(WorkerMessage::ExitComplete);
    }
}

/// # Stream worker entry point.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use streamvisor::{PollExitResponse, Record, Request, Response, Worker, WorkerContext, WorkerError};
///
/// struct Idle;
///
/// #[async_trait]
/// impl Worker for Idle {
///     async fn run(&self, ctx: WorkerContext) -> Result<(), WorkerError> {
///         let mut exiting = false;
///         while let Some(record) = ctx.next_record().await {
///             match record {
///                 Record::Request { mailbox, request: Request::Status } => {
///                     ctx.respond(mailbox, Response::Status)?;
///                 }
///                 Record::Request { mailbox, request: Request::PollExit } => {
///                     let done = PollExitResponse { done: exiting };
///                     ctx.respond(mailbox, Response::PollExit(done))?;
///                 }
///                 Record::Exit { .. } => exiting = true,
///                 Record::Shutdown => break,
///                 Record::Data(_) => {}
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        "worker"
    }

    /// Runs the stream until shutdown.
    async fn run(&self, ctx: WorkerContext) -> Result<(), WorkerError>;
}

/// Shared handle to a worker entry point.
pub type WorkerRef = Arc<dyn Worker>;

/// Function-backed worker.
///
/// Wraps a closure that creates a new future per stream.
pub struct WorkerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, Fut> WorkerFn<F>
where
    F: Fn(WorkerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    /// Creates a new function-backed worker.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the worker and returns it as a shared [`WorkerRef`].
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> WorkerRef {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Worker for WorkerFn<F>
where
    F: Fn(WorkerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: WorkerContext) -> Result<(), WorkerError> {
        (self.f)(ctx).await
    }
}

/// Background execution unit running one worker entry point.
pub struct WorkerHandle {
    stream_id: Arc<str>,
    join: Mutex<Option<JoinHandle<Result<(), WorkerError>>>>,
    /// Cancelled when the entry point returns, panics or is aborted.
    exited: CancellationToken,
}

impl WorkerHandle {
    /// Spawns the worker on the current runtime.
    pub fn spawn(worker: WorkerRef, ctx: WorkerContext) -> Self {
        let stream_id = Arc::clone(&ctx.stream_id);
        let exited = CancellationToken::new();
        let guard = exited.clone().drop_guard();
        let join = tokio::spawn(async move {
            let _guard = guard;
            worker.run(ctx).await
        });
        Self {
            stream_id,
            join: Mutex::new(Some(join)),
            exited,
        }
    }

    /// Completes once the entry point has stopped running.
    pub fn exited(&self) -> WaitForCancellationFuture<'_> {
        self.exited.cancelled()
    }

    /// Waits for the unit to exit and reports abnormal exits on `bus`.
    ///
    /// Subsequent calls return immediately.
    pub async fn join(&self, bus: &Bus) {
        let Some(join) = self.take() else { return };
        match join.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => bus.publish(
                Event::new(EventKind::WorkerFailed)
                    .with_stream(Arc::clone(&self.stream_id))
                    .with_reason(e.to_string()),
            ),
            Err(je) if je.is_cancelled() => {}
            Err(_) => bus.publish(
                Event::new(EventKind::WorkerPanicked)
                    .with_stream(Arc::clone(&self.stream_id))
                    .with_reason("worker_panic"),
            ),
        }
    }

    /// Aborts the unit without waiting for a graceful exit.
    pub fn abort(&self) {
        if let Some(join) = self.join.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            join.abort();
        }
    }

    /// Returns true once the unit has exited (or was joined).
    pub fn is_finished(&self) -> bool {
        self.join
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_none_or(|j| j.is_finished())
    }

    fn take(&self) -> Option<JoinHandle<Result<(), WorkerError>>> {
        self.join.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}
