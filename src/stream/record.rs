//! # Messages exchanged between a stream's control interface and its worker.
//!
//! ```text
//! Relay ── Record ──► [inbound queue] ──► worker
//! Relay ◄── WorkerMessage ── [outbound queue] ◄── worker
//! ```
//!
//! Requests carry a `mailbox` number; the worker answers with a
//! [`WorkerMessage::Response`] carrying the same number.

use serde_json::Value;

/// Mailbox number pairing a request with its response.
pub type Mailbox = u64;

/// Message placed on a stream's inbound queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A request the worker must answer with [`WorkerMessage::Response`].
    Request {
        /// Mailbox to answer on.
        mailbox: Mailbox,
        /// The request body.
        request: Request,
    },
    /// Finish the stream with the given exit code (no reply expected).
    Exit {
        /// Global exit code.
        code: i32,
    },
    /// A work item published by a caller.
    Data(Value),
    /// The control interface is shutting down; the worker should exit.
    Shutdown,
}

/// Control requests understood by every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Liveness probe used at startup.
    Status,
    /// Has the finish sequence completed?
    PollExit,
}

/// Reply to a poll-completion request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollExitResponse {
    /// True once the worker has fully processed its exit.
    pub done: bool,
}

/// Worker answers to [`Request`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Status probe acknowledgement.
    Status,
    /// Poll-completion answer.
    PollExit(PollExitResponse),
}

/// Message placed on a stream's outbound queue.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    /// Answer to a request.
    Response {
        /// Mailbox of the request being answered.
        mailbox: Mailbox,
        /// The answer.
        response: Response,
    },
    /// Unsolicited notice that the finish sequence completed.
    ExitComplete,
    /// A result for consumers; forwarded to the side channel unless the stream is detached.
    Data(Value),
}
