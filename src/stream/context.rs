//! # Execution context: the resource bundle owned for one stream.
//!
//! A [`StreamContext`] groups the three queues, the [`Relay`] bound to them and
//! the [`WorkerHandle`] running the stream's worker.
//!
//! ## Lifecycle
//! ```text
//! create() ──► start(worker) ──► [status probe ok] ──► ... ──► close()
//!                   │                                          ▲
//!                   └─ probe fails ──► abort() ────────────────┘ (reclaimed, error returned)
//!
//! detach() may be called at any point before close() to discard further results.
//! ```
//!
//! ## Rules
//! - A context is started at most once.
//! - `close()` sends the interface shutdown signal, closes all queues, then
//!   joins the worker; it returns only after the worker exited.
//! - `abort()` is reserved for startup faults and abandon-on-orphan: the worker
//!   is cancelled instead of awaited gracefully.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde_json::Value;

use crate::error::StreamError;
use crate::events::Bus;

use super::queue::Queue;
use super::record::{PollExitResponse, Record, WorkerMessage};
use super::relay::Relay;
use super::settings::StreamSettings;
use super::worker::{WorkerContext, WorkerHandle, WorkerRef};

/// Where the hosting process can be reached, handed to every worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Launch {
    /// Listening port, if any.
    pub port: Option<u16>,
    /// Owner process id, if any.
    pub owner_pid: Option<u32>,
}

/// Resource bundle (queues + control interface + worker handle) of one stream.
pub struct StreamContext {
    id: Arc<str>,
    settings: StreamSettings,
    records: Queue<Record>,
    results: Queue<WorkerMessage>,
    iface: Relay,
    worker: OnceLock<WorkerHandle>,
}

impl std::fmt::Debug for StreamContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamContext")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl StreamContext {
    /// Allocates the queues and binds a control interface to them.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create(id: impl Into<Arc<str>>, settings: StreamSettings) -> Self {
        let id = id.into();
        let records = Queue::new();
        let results = Queue::new();
        let relay: Queue<Value> = Queue::new();
        let iface = Relay::new(Arc::clone(&id), records.clone(), results.clone(), relay);
        Self {
            id,
            settings,
            records,
            results,
            iface,
            worker: OnceLock::new(),
        }
    }

    /// Launches `worker` and waits until it answers the status probe.
    ///
    /// With `startup_timeout = None` the wait is unbounded. On error the worker
    /// may still be running; the caller reclaims it with [`StreamContext::abort`].
    pub async fn start(
        &self,
        worker: WorkerRef,
        launch: Launch,
        startup_timeout: Option<Duration>,
    ) -> Result<(), StreamError> {
        let ctx = WorkerContext {
            stream_id: Arc::clone(&self.id),
            settings: self.settings.clone(),
            records: self.records.clone(),
            results: self.results.clone(),
            port: launch.port,
            owner_pid: launch.owner_pid,
        };

        let handle = WorkerHandle::spawn(worker, ctx);
        if let Err(duplicate) = self.worker.set(handle) {
            duplicate.abort();
            return Err(self.startup_failed("stream already started"));
        }
        let Some(handle) = self.worker.get() else {
            return Err(self.startup_failed("worker handle missing"));
        };

        let probe = async {
            tokio::select! {
                biased;
                res = self.iface.communicate_status() => res,
                _ = handle.exited() => Err(self.startup_failed("worker exited before status reply")),
            }
        };

        match startup_timeout {
            Some(timeout) => tokio::time::timeout(timeout, probe).await.unwrap_or_else(|_| {
                Err(StreamError::WorkerStartupTimeout {
                    id: self.id.to_string(),
                    timeout,
                })
            }),
            None => probe.await,
        }
    }

    /// Sends one poll-completion request.
    ///
    /// A worker unit that already exited cannot answer; it counts as done.
    pub async fn poll_exit(&self) -> Result<PollExitResponse, StreamError> {
        let Some(handle) = self.worker.get() else {
            return Ok(PollExitResponse { done: true });
        };
        tokio::select! {
            biased;
            res = self.iface.communicate_poll_exit() => res,
            _ = handle.exited() => Ok(PollExitResponse { done: true }),
        }
    }

    /// Detaches the control interface so further results for this stream are discarded.
    pub fn detach(&self) {
        self.iface.detach();
    }

    /// Shuts the interface down, closes the queues and joins the worker.
    pub async fn close(&self, bus: &Bus) {
        self.iface.join().await;
        self.close_queues();
        if let Some(handle) = self.worker.get() {
            handle.join(bus).await;
        }
    }

    /// Detaches, cancels the worker and reclaims everything without a graceful finish.
    pub async fn abort(&self, bus: &Bus) {
        self.detach();
        if let Some(handle) = self.worker.get() {
            handle.abort();
        }
        self.close(bus).await;
    }

    /// Stream id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Settings the stream was added with.
    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    /// Control interface bound to this stream's queues.
    pub fn interface(&self) -> &Relay {
        &self.iface
    }

    /// Inbound queue (records for the worker).
    pub fn inbound(&self) -> &Queue<Record> {
        &self.records
    }

    /// Side-channel queue (results forwarded by the interface).
    pub fn side_channel(&self) -> &Queue<Value> {
        self.iface.relay_queue()
    }

    /// Returns true once the worker unit has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.get().is_none_or(WorkerHandle::is_finished)
    }

    fn close_queues(&self) {
        self.records.close();
        self.results.close();
        self.iface.relay_queue().close();
    }

    fn startup_failed(&self, reason: &str) -> StreamError {
        StreamError::WorkerStartupFailed {
            id: self.id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Drop for StreamContext {
    fn drop(&mut self) {
        self.close_queues();
    }
}
