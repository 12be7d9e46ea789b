//! # Control loop: sole consumer of the action queue and sole writer of the registry.
//!
//! ```text
//! RUNNING ──(teardown dequeued | owner gone)──► STOPPING ──► STOPPED
//!
//! loop {
//!   ├─► orphan check (throttled)      ── owner gone ─► on_orphaned() ─► break
//!   ├─► recv action (bounded wait)    ── timeout    ─► continue
//!   ├─► dispatch(action)
//!   │     ├─ Add      → create + start context, register
//!   │     ├─ Remove   → unregister, close
//!   │     ├─ Disown   → unregister, detach, close
//!   │     └─ Teardown → snapshot, drain, clear
//!   └─► complete(result)              (after teardown: state = STOPPED first)
//! }
//! on exit: reject queued actions with SupervisorStopped
//! ```
//!
//! ## Rules
//! - Errors go back to the caller through the completion signal; the loop keeps going.
//! - A teardown completion fires only after the state is `Stopped`.
//! - If every supervisor handle is dropped, streams are abandoned like an orphan stop.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, watch};

use crate::error::StreamError;
use crate::events::{Bus, Event, EventKind};
use crate::stream::{StreamContext, StreamSettings, WorkerRef};

use super::action::{Action, ActionRequest};
use super::config::{OrphanPolicy, SupervisorConfig};
use super::drain::drain;
use super::endpoint::Endpoint;
use super::orphan::OrphanWatch;
use super::registry::Registry;
use super::supervisor::SupervisorState;

pub(crate) struct ControlLoop {
    pub cfg: SupervisorConfig,
    pub bus: Bus,
    pub registry: Arc<Registry>,
    pub endpoint: Arc<Endpoint>,
    pub worker: WorkerRef,
    pub actions: mpsc::UnboundedReceiver<ActionRequest>,
    pub state: watch::Sender<SupervisorState>,
}

impl ControlLoop {
    /// Runs until teardown, orphan detection, or all handles are gone.
    pub async fn run(mut self) {
        let mut orphan = OrphanWatch::new(Arc::clone(&self.endpoint), self.cfg.orphan_check_interval);

        loop {
            if orphan.check() {
                self.on_orphaned().await;
                break;
            }

            let req = match tokio::time::timeout(self.cfg.action_timeout, self.actions.recv()).await {
                Err(_elapsed) => continue,
                Ok(Some(req)) => req,
                Ok(None) => {
                    tracing::warn!("all supervisor handles dropped; abandoning streams");
                    self.set_state(SupervisorState::Stopping);
                    self.abandon_all().await;
                    break;
                }
            };

            let action = req.action().clone();
            tracing::debug!(action = action.as_label(), stream = ?action.target(), "dispatching");
            let res = self.dispatch(&action).await;

            if let Err(e) = &res {
                tracing::warn!(action = action.as_label(), error = %e, "action failed");
                let mut ev = Event::new(EventKind::ActionFailed).with_reason(e.as_label());
                if let Some(id) = action.target() {
                    ev = ev.with_stream(id);
                }
                self.bus.publish(ev);
            }

            if matches!(action, Action::Teardown { .. }) {
                self.stop();
                req.complete(res);
                break;
            }
            req.complete(res);
        }

        self.stop();
    }

    async fn dispatch(&self, action: &Action) -> Result<(), StreamError> {
        match action {
            Action::Add { id, settings } => self.add(id, settings).await,
            Action::Remove { id } => self.remove(id).await,
            Action::Disown { id } => self.disown(id).await,
            Action::Teardown { exit_code } => {
                self.teardown(*exit_code).await;
                Ok(())
            }
        }
    }

    async fn add(&self, id: &str, settings: &StreamSettings) -> Result<(), StreamError> {
        if self.registry.contains(id).await {
            return Err(StreamError::DuplicateStream { id: id.to_string() });
        }

        let ctx = Arc::new(StreamContext::create(id, settings.clone()));
        let started = ctx
            .start(
                Arc::clone(&self.worker),
                self.endpoint.launch(),
                self.cfg.startup_limit(),
            )
            .await;
        if let Err(e) = started {
            ctx.abort(&self.bus).await;
            self.bus.publish(
                Event::new(EventKind::StreamStartFailed)
                    .with_stream(id)
                    .with_reason(e.as_label()),
            );
            return Err(e);
        }

        self.registry.insert(ctx).await?;
        self.bus
            .publish(Event::new(EventKind::StreamAdded).with_stream(id));
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), StreamError> {
        let ctx = self.registry.take(id).await?;
        ctx.close(&self.bus).await;
        self.bus
            .publish(Event::new(EventKind::StreamRemoved).with_stream(id));
        Ok(())
    }

    async fn disown(&self, id: &str) -> Result<(), StreamError> {
        let ctx = self.registry.take(id).await?;
        ctx.detach();
        ctx.close(&self.bus).await;
        self.bus
            .publish(Event::new(EventKind::StreamDisowned).with_stream(id));
        Ok(())
    }

    async fn teardown(&self, exit_code: i32) {
        self.set_state(SupervisorState::Stopping);
        self.bus
            .publish(Event::new(EventKind::TeardownRequested).with_exit_code(exit_code));

        let snapshot = self.registry.snapshot().await;
        tracing::info!(streams = snapshot.len(), exit_code, "teardown: draining streams");
        drain(snapshot, exit_code, self.cfg.drain_poll_interval, &self.bus).await;
        self.registry.drain_all().await;

        self.bus
            .publish(Event::new(EventKind::TeardownCompleted).with_exit_code(exit_code));
    }

    async fn on_orphaned(&self) {
        let pid = self.endpoint.owner_pid().unwrap_or_default();
        tracing::warn!(owner_pid = pid, policy = ?self.cfg.orphan_policy, "owner process gone");
        self.bus.publish(
            Event::new(EventKind::OrphanDetected).with_reason(format!("owner_pid={pid}")),
        );

        match self.cfg.orphan_policy {
            OrphanPolicy::Abandon => {
                self.set_state(SupervisorState::Stopping);
                self.abandon_all().await;
            }
            OrphanPolicy::Drain => self.teardown(self.cfg.orphan_exit_code).await,
        }
    }

    /// Detaches and cancels every stream without the drain protocol.
    async fn abandon_all(&self) {
        let streams = self.registry.drain_all().await;
        join_all(streams.iter().map(|(_, ctx)| ctx.abort(&self.bus))).await;
    }

    /// Reaches `Stopped` and rejects whatever is still queued. Idempotent.
    fn stop(&mut self) {
        self.actions.close();
        while let Ok(req) = self.actions.try_recv() {
            req.reject();
        }
        if *self.state.borrow() != SupervisorState::Stopped {
            tracing::info!("supervisor stopped");
            // Published first so the subscriber listener still forwards it.
            self.bus.publish(Event::new(EventKind::SupervisorStopped));
            self.set_state(SupervisorState::Stopped);
        }
    }

    fn set_state(&self, state: SupervisorState) {
        self.state.send_replace(state);
    }
}
