//! Stub workers shared by unit tests.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WorkerError;

use super::record::{PollExitResponse, Record, Request, Response};
use super::worker::{Worker, WorkerContext, WorkerFn, WorkerRef};

/// What a [`StubWorker`] observed.
#[derive(Default)]
pub struct Probe {
    pub exit_code: AtomicI32,
    pub exited: AtomicBool,
    pub polls: AtomicU32,
    pub shutdown: AtomicBool,
}

/// Answers status at once, reports done on the `k`-th poll after `Exit`,
/// echoes data records back as results.
pub struct StubWorker {
    k: u32,
    push: bool,
    probe: Arc<Probe>,
}

impl StubWorker {
    pub fn arc(k: u32) -> WorkerRef {
        Self::with_probe(k).0
    }

    pub fn with_probe(k: u32) -> (WorkerRef, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let worker = Arc::new(Self {
            k,
            push: false,
            probe: Arc::clone(&probe),
        });
        (worker, probe)
    }

    /// Answers the first poll after `Exit` with "not done", then finishes and pushes `ExitComplete`.
    pub fn pushing(k: u32) -> (WorkerRef, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let worker = Arc::new(Self {
            k,
            push: true,
            probe: Arc::clone(&probe),
        });
        (worker, probe)
    }
}

#[async_trait]
impl Worker for StubWorker {
    fn name(&self) -> &str {
        "stub"
    }

    async fn run(&self, ctx: WorkerContext) -> Result<(), WorkerError> {
        let mut polls_after_exit = 0;
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
                    self.probe.polls.fetch_add(1, Ordering::SeqCst);
                    let exiting = self.probe.exited.load(Ordering::SeqCst);
                    if exiting {
                        polls_after_exit += 1;
                    }
                    let done = exiting && polls_after_exit >= self.k;
                    ctx.respond(mailbox, Response::PollExit(PollExitResponse { done }))?;
                    if exiting && !done && self.push {
                        polls_after_exit = self.k;
                        ctx.notify_exit_complete();
                    }
                }
                Record::Exit { code } => {
                    self.probe.exit_code.store(code, Ordering::SeqCst);
                    self.probe.exited.store(true, Ordering::SeqCst);
                }
                Record::Data(value) => ctx.emit(value)?,
                Record::Shutdown => {
                    self.probe.shutdown.store(true, Ordering::SeqCst);
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Never answers anything; exits when its inbound queue shuts down.
pub fn silent_worker() -> WorkerRef {
    WorkerFn::arc("silent", |ctx: WorkerContext| async move {
        while let Some(record) = ctx.next_record().await {
            if record == Record::Shutdown {
                break;
            }
        }
        Ok(())
    })
}
