//! # Logging subscriber.
//!
//! [`LogWriter`] renders every [`Event`] as a `tracing` record under the
//! `streamvisor::events` target. Failures and anomalies log at `warn`, the rest at `info`.
//!
//! ## Output format
//! ```text
//! [stream-added] stream=run-1
//! [teardown-requested] exit_code=0
//! [stream-finishing] stream=run-1 exit_code=0
//! [stream-drained] stream=run-1 polls=3
//! [teardown-completed] exit_code=0
//! [orphan-detected] reason=owner_pid=4242
//! [supervisor-stopped]
//! ```
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use streamvisor::{LogWriter, Subscribe, Supervisor, SupervisorConfig, WorkerRef};
//! # fn demo(worker: WorkerRef) {
//! let sup = Supervisor::builder(SupervisorConfig::default(), worker)
//!     .with_subscribers(vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>])
//!     .build();
//! # }
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber backed by `tracing`.
///
/// Enabled via the `logging` feature.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Short tag used as the log line prefix.
fn tag(kind: EventKind) -> &'static str {
    match kind {
        EventKind::SubscriberPanicked => "subscriber-panicked",
        EventKind::SubscriberOverflow => "subscriber-overflow",
        EventKind::StreamAdded => "stream-added",
        EventKind::StreamStartFailed => "stream-start-failed",
        EventKind::StreamRemoved => "stream-removed",
        EventKind::StreamDisowned => "stream-disowned",
        EventKind::ActionFailed => "action-failed",
        EventKind::TeardownRequested => "teardown-requested",
        EventKind::StreamFinishing => "stream-finishing",
        EventKind::StreamDrained => "stream-drained",
        EventKind::TeardownCompleted => "teardown-completed",
        EventKind::OrphanDetected => "orphan-detected",
        EventKind::SupervisorStopped => "supervisor-stopped",
        EventKind::WorkerFailed => "worker-failed",
        EventKind::WorkerPanicked => "worker-panicked",
    }
}

fn is_warning(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::SubscriberPanicked
            | EventKind::SubscriberOverflow
            | EventKind::StreamStartFailed
            | EventKind::ActionFailed
            | EventKind::OrphanDetected
            | EventKind::WorkerFailed
            | EventKind::WorkerPanicked
    )
}

/// Renders the event as `[tag] key=value ...`.
pub(crate) fn render(e: &Event) -> String {
    let mut line = format!("[{}]", tag(e.kind));
    if let Some(stream) = &e.stream {
        line.push_str(&format!(" stream={stream}"));
    }
    if let Some(code) = e.exit_code {
        line.push_str(&format!(" exit_code={code}"));
    }
    if let Some(polls) = e.polls {
        line.push_str(&format!(" polls={polls}"));
    }
    if let Some(reason) = &e.reason {
        line.push_str(&format!(" reason={reason}"));
    }
    line
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let line = render(e);
        if is_warning(e.kind) {
            tracing::warn!(target: "streamvisor::events", seq = e.seq, "{line}");
        } else {
            tracing::info!(target: "streamvisor::events", seq = e.seq, "{line}");
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_present_fields_only() {
        let ev = Event::new(EventKind::StreamDrained)
            .with_stream("run-1")
            .with_polls(3);
        assert_eq!(render(&ev), "[stream-drained] stream=run-1 polls=3");

        let ev = Event::new(EventKind::SupervisorStopped);
        assert_eq!(render(&ev), "[supervisor-stopped]");
    }

    #[test]
    fn test_failures_log_as_warnings() {
        assert!(is_warning(EventKind::WorkerPanicked));
        assert!(is_warning(EventKind::OrphanDetected));
        assert!(!is_warning(EventKind::StreamAdded));
    }
}
