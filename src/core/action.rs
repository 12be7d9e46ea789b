//! # Control-plane actions and their completion signal.
//!
//! Callers build an [`ActionRequest`], push it onto the supervisor's FIFO queue
//! and await the paired [`Completion`]. The control loop is the only consumer;
//! it completes each request exactly once, after the action's effects are
//! visible to every accessor.
//!
//! ```text
//! caller ──► ActionRequest::new(action) ──► (request, completion)
//!              request ──► [action queue] ──► ControlLoop::dispatch ──► request.complete(res)
//!              completion.wait() ◄──────────────────────────────────────────────┘
//! ```
//!
//! A request dropped without completion (loop stopped) resolves to
//! [`StreamError::SupervisorStopped`].

use tokio::sync::oneshot;

use crate::error::StreamError;
use crate::stream::StreamSettings;

/// Closed set of control-plane operations.
#[derive(Debug, Clone)]
pub enum Action {
    /// Create, start and register a stream.
    Add { id: String, settings: StreamSettings },
    /// Unregister a stream and reclaim its resources.
    Remove { id: String },
    /// Unregister, detach and reclaim a stream without a graceful finish.
    Disown { id: String },
    /// Drain every stream and stop the supervisor.
    Teardown { exit_code: i32 },
}

impl Action {
    /// Target stream id (`None` for teardown).
    pub fn target(&self) -> Option<&str> {
        match self {
            Action::Add { id, .. } | Action::Remove { id } | Action::Disown { id } => Some(id),
            Action::Teardown { .. } => None,
        }
    }

    /// Short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Action::Add { .. } => "add",
            Action::Remove { .. } => "remove",
            Action::Disown { .. } => "disown",
            Action::Teardown { .. } => "teardown",
        }
    }
}

/// One queued action plus its single-use completion signal.
#[derive(Debug)]
pub struct ActionRequest {
    action: Action,
    done: oneshot::Sender<Result<(), StreamError>>,
}

/// Caller side of an [`ActionRequest`].
#[derive(Debug)]
pub struct Completion(oneshot::Receiver<Result<(), StreamError>>);

impl ActionRequest {
    /// Creates a request and the completion its caller waits on.
    pub fn new(action: Action) -> (Self, Completion) {
        let (done, rx) = oneshot::channel();
        (Self { action, done }, Completion(rx))
    }

    /// The requested action.
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// Signals completion; consumes the request so it fires exactly once.
    pub fn complete(self, res: Result<(), StreamError>) {
        let _ = self.done.send(res);
    }

    /// Completes the request with [`StreamError::SupervisorStopped`].
    pub fn reject(self) {
        self.complete(Err(StreamError::SupervisorStopped));
    }
}

impl Completion {
    /// Waits until the control loop has applied the action.
    pub async fn wait(self) -> Result<(), StreamError> {
        self.0.await.unwrap_or(Err(StreamError::SupervisorStopped))
    }
}
