//! # Per-stream control interface.
//!
//! [`Relay`] is bound to a stream's three queues and gives the supervisor a
//! request/response surface over them.
//!
//! ## Architecture
//! ```text
//! communicate_status() ──┐
//! communicate_poll_exit()┼─► Record::Request{mailbox} ──► [inbound] ──► worker
//!                        │
//!                pending mailboxes ◄── router ◄── [outbound] ◄── worker
//!                                        ├─ Response{mailbox} → complete mailbox
//!                                        ├─ ExitComplete      → wake drain
//!                                        └─ Data(v)           → [side channel] (unless detached)
//! ```
//!
//! ## Rules
//! - The router task is the only consumer of the outbound queue.
//! - Once detached, results are discarded instead of forwarded.
//! - When the router stops, every pending mailbox fails with `InterfaceClosed`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::StreamError;

use super::queue::Queue;
use super::record::{Mailbox, PollExitResponse, Record, Request, Response, WorkerMessage};

type Pending = Arc<Mutex<HashMap<Mailbox, oneshot::Sender<Response>>>>;

/// Control interface of one stream.
pub struct Relay {
    id: Arc<str>,
    records: Queue<Record>,
    relay: Queue<Value>,
    pending: Pending,
    next_mailbox: AtomicU64,
    detached: Arc<AtomicBool>,
    exit_notice: Arc<Notify>,
    shutdown: CancellationToken,
    router_done: CancellationToken,
    router: Mutex<Option<JoinHandle<()>>>,
}

impl Relay {
    /// Binds an interface to the given queues and starts its router task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        id: Arc<str>,
        records: Queue<Record>,
        results: Queue<WorkerMessage>,
        relay: Queue<Value>,
    ) -> Self {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let detached = Arc::new(AtomicBool::new(false));
        let exit_notice = Arc::new(Notify::new());
        let shutdown = CancellationToken::new();
        let router_done = CancellationToken::new();

        let router = tokio::spawn(route(
            results,
            relay.clone(),
            Arc::clone(&pending),
            Arc::clone(&detached),
            Arc::clone(&exit_notice),
            shutdown.clone(),
            router_done.clone(),
        ));

        Self {
            id,
            records,
            relay,
            pending,
            next_mailbox: AtomicU64::new(1),
            detached,
            exit_notice,
            shutdown,
            router_done,
            router: Mutex::new(Some(router)),
        }
    }

    /// Sends a status probe and waits for the acknowledgement.
    pub async fn communicate_status(&self) -> Result<(), StreamError> {
        match self.communicate(Request::Status).await? {
            Response::Status => Ok(()),
            other => Err(StreamError::WorkerStartupFailed {
                id: self.id.to_string(),
                reason: format!("unexpected status reply: {other:?}"),
            }),
        }
    }

    /// Tells the worker to finish with `code` (fire-and-forget).
    pub fn publish_exit(&self, code: i32) {
        let _ = self.records.put(Record::Exit { code });
    }

    /// Asks the worker whether its finish sequence has completed.
    ///
    /// A reply of any other kind counts as "not done yet".
    pub async fn communicate_poll_exit(&self) -> Result<PollExitResponse, StreamError> {
        match self.communicate(Request::PollExit).await? {
            Response::PollExit(resp) => Ok(resp),
            Response::Status => Ok(PollExitResponse::default()),
        }
    }

    /// Publishes a work item onto the inbound queue.
    pub fn publish(&self, value: Value) -> Result<(), StreamError> {
        self.records
            .put(Record::Data(value))
            .map_err(|_| StreamError::InterfaceClosed {
                id: self.id.to_string(),
            })
    }

    /// Side-channel queue receiving the worker's results.
    pub fn relay_queue(&self) -> &Queue<Value> {
        &self.relay
    }

    /// Marks the interface detached: future results are discarded.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    /// Returns true once [`Relay::detach`] was called.
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// Completes when the worker pushes an `ExitComplete` notice.
    ///
    /// A notice sent while nobody waits is kept and consumed by the next call.
    pub fn exit_notified(&self) -> impl Future<Output = ()> + '_ {
        self.exit_notice.notified()
    }

    /// Sends the shutdown signal and stops the router task.
    pub async fn join(&self) {
        let _ = self.records.put(Record::Shutdown);
        self.shutdown.cancel();

        let router = self
            .router
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(router) = router {
            let _ = router.await;
        }
    }

    async fn communicate(&self, request: Request) -> Result<Response, StreamError> {
        let closed = || StreamError::InterfaceClosed {
            id: self.id.to_string(),
        };

        let mailbox = self.next_mailbox.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(mailbox, tx);

        if self.records.put(Record::Request { mailbox, request }).is_err() {
            lock(&self.pending).remove(&mailbox);
            return Err(closed());
        }

        tokio::select! {
            biased;
            reply = rx => reply.map_err(|_| closed()),
            _ = self.router_done.cancelled() => {
                lock(&self.pending).remove(&mailbox);
                Err(closed())
            }
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Router loop: sole consumer of the outbound queue.
async fn route(
    results: Queue<WorkerMessage>,
    relay: Queue<Value>,
    pending: Pending,
    detached: Arc<AtomicBool>,
    exit_notice: Arc<Notify>,
    shutdown: CancellationToken,
    done: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            _ = shutdown.cancelled() => break,
            msg = results.get() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        match msg {
            WorkerMessage::Response { mailbox, response } => {
                if let Some(tx) = lock(&pending).remove(&mailbox) {
                    let _ = tx.send(response);
                }
            }
            WorkerMessage::ExitComplete => exit_notice.notify_one(),
            WorkerMessage::Data(value) => {
                if !detached.load(Ordering::Acquire) {
                    let _ = relay.put(value);
                }
            }
        }
    }

    lock(&pending).clear();
    done.cancel();
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
