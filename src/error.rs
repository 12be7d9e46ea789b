//! Error types used by the streamvisor runtime and its workers.
//!
//! This module defines two main error enums:
//!
//! - [`StreamError`]: errors raised by the control plane (add/remove/disown/teardown, accessors).
//! - [`WorkerError`]: errors returned by a worker entry point.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the stream control plane.
///
/// Every variant is delivered synchronously to the caller that issued the
/// action; the control loop keeps processing subsequent actions.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Remove/disown/fetch targeted an id that is not registered.
    #[error("unknown stream: {id}")]
    UnknownStream {
        /// The requested stream id.
        id: String,
    },

    /// Add targeted an id that is already registered.
    #[error("stream already exists: {id}")]
    DuplicateStream {
        /// The duplicated stream id.
        id: String,
    },

    /// The worker did not answer the startup status probe in time.
    #[error("worker for stream {id} did not answer status probe within {timeout:?}")]
    WorkerStartupTimeout {
        /// Stream whose worker failed to start.
        id: String,
        /// The configured startup timeout.
        timeout: Duration,
    },

    /// The worker exited (or its interface closed) before answering the status probe.
    #[error("worker for stream {id} failed to start: {reason}")]
    WorkerStartupFailed {
        /// Stream whose worker failed to start.
        id: String,
        /// Why the probe failed.
        reason: String,
    },

    /// The control interface of a stream stopped before a reply arrived.
    #[error("control interface of stream {id} is closed")]
    InterfaceClosed {
        /// Stream whose interface is closed.
        id: String,
    },

    /// The supervisor reached `Stopped` and no longer accepts actions.
    #[error("supervisor is stopped")]
    SupervisorStopped,
}

impl StreamError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use streamvisor::StreamError;
    ///
    /// let err = StreamError::UnknownStream { id: "run-1".into() };
    /// assert_eq!(err.as_label(), "stream_unknown");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamError::UnknownStream { .. } => "stream_unknown",
            StreamError::DuplicateStream { .. } => "stream_duplicate",
            StreamError::WorkerStartupTimeout { .. } => "worker_startup_timeout",
            StreamError::WorkerStartupFailed { .. } => "worker_startup_failed",
            StreamError::InterfaceClosed { .. } => "interface_closed",
            StreamError::SupervisorStopped => "supervisor_stopped",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            StreamError::UnknownStream { id } => format!("unknown stream: {id}"),
            StreamError::DuplicateStream { id } => format!("duplicate stream: {id}"),
            StreamError::WorkerStartupTimeout { id, timeout } => {
                format!("startup timeout after {timeout:?}: {id}")
            }
            StreamError::WorkerStartupFailed { id, reason } => {
                format!("startup failed: {id}: {reason}")
            }
            StreamError::InterfaceClosed { id } => format!("interface closed: {id}"),
            StreamError::SupervisorStopped => "supervisor stopped".to_string(),
        }
    }
}

/// # Errors returned by a worker entry point.
///
/// A worker error never reaches a control-plane caller; it is reported as a
/// [`EventKind::WorkerFailed`](crate::EventKind::WorkerFailed) event when the
/// worker unit is joined.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker failed while processing its stream.
    #[error("worker failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Worker hit a non-recoverable condition.
    #[error("fatal worker error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Worker observed its queues closing before it finished.
    #[error("worker canceled")]
    Canceled,
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use streamvisor::WorkerError;
    ///
    /// let err = WorkerError::Fail { error: "upload".into() };
    /// assert_eq!(err.as_label(), "worker_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Fatal { .. } => "worker_fatal",
            WorkerError::Canceled => "worker_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkerError::Fail { error } => format!("error: {error}"),
            WorkerError::Fatal { error } => format!("fatal: {error}"),
            WorkerError::Canceled => "canceled".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let cases = [
            (StreamError::UnknownStream { id: "a".into() }, "stream_unknown"),
            (StreamError::DuplicateStream { id: "a".into() }, "stream_duplicate"),
            (
                StreamError::WorkerStartupTimeout {
                    id: "a".into(),
                    timeout: Duration::from_secs(1),
                },
                "worker_startup_timeout",
            ),
            (StreamError::SupervisorStopped, "supervisor_stopped"),
        ];
        for (err, label) in cases {
            assert_eq!(err.as_label(), label);
        }
    }

    #[test]
    fn test_display_names_the_stream() {
        let err = StreamError::DuplicateStream { id: "run-1".into() };
        assert_eq!(err.to_string(), "stream already exists: run-1");
        assert_eq!(err.as_message(), "duplicate stream: run-1");
    }
}
