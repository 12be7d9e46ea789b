//! # Runtime events emitted by the control loop, drain protocol and workers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Stream lifecycle**: registration, removal, abandonment, startup faults
//! - **Teardown**: drain progress and completion
//! - **Supervisor**: orphan detection and the final stop
//! - **Subscriber**: fan-out overflow and panics
//!
//! The [`Event`] struct carries additional metadata such as timestamps, stream id,
//! reasons, exit codes and poll counts.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use streamvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StreamDrained)
//!     .with_stream("run-1")
//!     .with_exit_code(0)
//!     .with_polls(3);
//!
//! assert_eq!(ev.kind, EventKind::StreamDrained);
//! assert_eq!(ev.stream.as_deref(), Some("run-1"));
//! assert_eq!(ev.polls, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `stream`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `stream`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Stream lifecycle events ===
    /// Stream worker started and the stream was registered.
    ///
    /// Sets:
    /// - `stream`: stream id
    StreamAdded,

    /// Stream worker did not pass its startup probe; nothing was registered.
    ///
    /// Sets:
    /// - `stream`: stream id
    /// - `reason`: error label
    StreamStartFailed,

    /// Stream was removed and its resources reclaimed.
    ///
    /// Sets:
    /// - `stream`: stream id
    StreamRemoved,

    /// Stream was detached and closed without a graceful finish.
    ///
    /// Sets:
    /// - `stream`: stream id
    StreamDisowned,

    /// An action completed with an error (reported to its caller as well).
    ///
    /// Sets:
    /// - `stream`: target stream id (if any)
    /// - `reason`: error label
    ActionFailed,

    // === Teardown events ===
    /// Teardown action dequeued; drain protocol is about to start.
    ///
    /// Sets:
    /// - `exit_code`: global exit code
    TeardownRequested,

    /// Stream was told to finish with the global exit code.
    ///
    /// Sets:
    /// - `stream`: stream id
    /// - `exit_code`: exit code sent
    StreamFinishing,

    /// Stream reported completion of its finish sequence.
    ///
    /// Sets:
    /// - `stream`: stream id
    /// - `polls`: number of poll-completion requests it took
    StreamDrained,

    /// All snapshotted streams drained and were closed.
    ///
    /// Sets:
    /// - `exit_code`: global exit code
    TeardownCompleted,

    // === Supervisor events ===
    /// Owner process no longer exists.
    ///
    /// Sets:
    /// - `reason`: owner pid
    OrphanDetected,

    /// Control loop reached `Stopped`.
    SupervisorStopped,

    // === Worker terminal states ===
    /// Worker entry point returned an error.
    ///
    /// Sets:
    /// - `stream`: stream id
    /// - `reason`: worker error message
    WorkerFailed,

    /// Worker entry point panicked.
    ///
    /// Sets:
    /// - `stream`: stream id
    /// - `reason`: "worker_panic"
    WorkerPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Stream id (or subscriber name for subscriber events).
    pub stream: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Exit code carried by teardown events.
    pub exit_code: Option<i32>,
    /// Number of poll-completion requests sent to a stream.
    pub polls: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            stream: None,
            reason: None,
            exit_code: None,
            polls: None,
        }
    }

    /// Attaches a stream id.
    #[inline]
    pub fn with_stream(mut self, stream: impl Into<Arc<str>>) -> Self {
        self.stream = Some(stream.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an exit code.
    #[inline]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Attaches a poll count.
    #[inline]
    pub fn with_polls(mut self, polls: u32) -> Self {
        self.polls = Some(polls);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_stream(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_stream(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}
