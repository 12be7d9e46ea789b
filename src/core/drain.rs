//! # Drain protocol: coordinated shutdown of many streams.
//!
//! ```text
//! snapshot ──► fan-out: publish_exit(code) to every stream (non-blocking)
//!                 │
//!                 ▼
//!          ┌─► poll cycle: poll_exit() on every pending stream (concurrently)
//!          │      ├─ done     → to_close (StreamDrained)
//!          │      └─ not done → still pending
//!          │      │
//!          │      ▼
//!          └── wait: poll interval OR any pending stream pushes ExitComplete
//!                 │ (pending empty)
//!                 ▼
//!          join: close() every drained stream in parallel
//! ```
//!
//! ## Rules
//! - Terminates only once every stream reported completion; there is no timeout.
//! - Polls are batched per cycle, so the wall-clock cost follows the poll
//!   interval, not the number of streams.
//! - Each stream's exit → poll → close sequence stays ordered.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, select_all};

use crate::events::{Bus, Event, EventKind};
use crate::stream::StreamContext;

struct Pending {
    id: String,
    ctx: Arc<StreamContext>,
    polls: u32,
}

/// Finishes every stream in `streams` with `exit_code` and closes them.
pub(crate) async fn drain(
    streams: Vec<(String, Arc<StreamContext>)>,
    exit_code: i32,
    poll_interval: Duration,
    bus: &Bus,
) {
    if streams.is_empty() {
        return;
    }

    let mut pending: Vec<Pending> = streams
        .into_iter()
        .map(|(id, ctx)| {
            tracing::info!(stream = %id, exit_code, "finishing stream");
            bus.publish(
                Event::new(EventKind::StreamFinishing)
                    .with_stream(id.as_str())
                    .with_exit_code(exit_code),
            );
            ctx.interface().publish_exit(exit_code);
            Pending { id, ctx, polls: 0 }
        })
        .collect();

    let mut to_close = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let replies = join_all(pending.iter().map(|p| p.ctx.poll_exit())).await;

        let mut still = Vec::with_capacity(pending.len());
        for (mut p, reply) in pending.into_iter().zip(replies) {
            p.polls += 1;
            let done = match reply {
                Ok(resp) => resp.done,
                Err(e) => {
                    tracing::warn!(stream = %p.id, error = %e, "poll failed; treating stream as drained");
                    true
                }
            };
            if done {
                bus.publish(
                    Event::new(EventKind::StreamDrained)
                        .with_stream(p.id.as_str())
                        .with_polls(p.polls),
                );
                to_close.push(p.ctx);
            } else {
                still.push(p);
            }
        }
        pending = still;

        if !pending.is_empty() {
            let notices = pending
                .iter()
                .map(|p| Box::pin(p.ctx.interface().exit_notified()));
            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                _ = select_all(notices) => {}
            }
        }
    }

    join_all(to_close.iter().map(|ctx| ctx.close(bus))).await;
}
