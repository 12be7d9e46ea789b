//! Per-stream resources: queues, control interface, worker.
//!
//! - [`queue`]: cloneable unbounded MPMC queue backing the three stream channels;
//! - [`record`]: messages exchanged over those queues;
//! - [`relay`]: control interface (status probe, exit, poll-exit, detach);
//! - [`worker`]: worker entry point trait and the handle running it;
//! - [`context`]: the bundle the supervisor owns per stream.

mod context;
mod queue;
mod record;
mod relay;
mod settings;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{Launch, StreamContext};
pub use queue::Queue;
pub use record::{Mailbox, PollExitResponse, Record, Request, Response, WorkerMessage};
pub use relay::Relay;
pub use settings::StreamSettings;
pub use worker::{Worker, WorkerContext, WorkerFn, WorkerHandle, WorkerRef};
