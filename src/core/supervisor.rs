//! # Supervisor: caller-facing control surface over the control loop.
//!
//! The [`Supervisor`] turns every lifecycle call into an [`ActionRequest`],
//! pushes it onto the FIFO action queue and waits for its completion. The
//! control loop applies actions one at a time, so all lifecycle operations are
//! totally ordered; accessors read the [`Registry`] directly.
//!
//! ## High-level architecture
//! ```text
//! caller threads (many)                         control loop (one task)
//!   add_stream / remove_stream ──┐
//!   disown_stream / teardown ────┼─► [action queue] ──► dispatch ──► Registry (writes)
//!                                │                         │
//!                 completion ◄───┴─────────────────────────┘
//!
//!   stream_ids / has_stream / get_stream ─────────────────────────► Registry (reads)
//!
//! Events:
//!   ControlLoop / drain / WorkerHandle ── publish ──► Bus ──► listener ──► SubscriberSet
//! ```
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use streamvisor::{
//!     PollExitResponse, Record, Request, Response, Supervisor, SupervisorConfig,
//!     WorkerContext, WorkerFn,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let worker = WorkerFn::arc("echo", |ctx: WorkerContext| async move {
//!         let mut exiting = false;
//!         while let Some(record) = ctx.next_record().await {
//!             match record {
//!                 Record::Request { mailbox, request: Request::Status } => {
//!                     ctx.respond(mailbox, Response::Status)?
//!                 }
//!                 Record::Request { mailbox, request: Request::PollExit } => {
//!                     ctx.respond(mailbox, Response::PollExit(PollExitResponse { done: exiting }))?
//!                 }
//!                 Record::Exit { .. } => exiting = true,
//!                 Record::Data(v) => ctx.emit(v)?,
//!                 Record::Shutdown => break,
//!             }
//!         }
//!         Ok::<(), streamvisor::WorkerError>(())
//!     });
//!
//!     let sup = Supervisor::builder(SupervisorConfig::default(), worker).build();
//!     sup.add_stream("run-1", json!({"project": "demo"})).await?;
//!     assert_eq!(sup.stream_ids().await, vec!["run-1"]);
//!
//!     sup.teardown(0).await?;
//!     assert!(sup.stream_ids().await.is_empty());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};

use crate::error::StreamError;
use crate::events::{Bus, Event};
use crate::stream::{StreamContext, StreamSettings, WorkerRef};
use crate::subscribers::SubscriberSet;

use super::action::{Action, ActionRequest};
use super::builder::SupervisorBuilder;
use super::config::SupervisorConfig;
use super::endpoint::Endpoint;
use super::registry::Registry;
use super::shutdown;

/// Lifecycle of the control loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupervisorState {
    /// Accepting and applying actions.
    Running,
    /// Teardown or orphan stop in progress.
    Stopping,
    /// Terminal; further actions fail with `SupervisorStopped`.
    Stopped,
}

/// Serialized control plane for many concurrently active streams.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    registry: Arc<Registry>,
    endpoint: Arc<Endpoint>,
    actions: mpsc::UnboundedSender<ActionRequest>,
    state: watch::Receiver<SupervisorState>,
}

impl Supervisor {
    /// Creates a builder; `worker` is the entry point every stream runs.
    pub fn builder(cfg: SupervisorConfig, worker: WorkerRef) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, worker)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        subs: Arc<SubscriberSet>,
        registry: Arc<Registry>,
        endpoint: Arc<Endpoint>,
        actions: mpsc::UnboundedSender<ActionRequest>,
        state: watch::Receiver<SupervisorState>,
    ) -> Self {
        Self {
            cfg,
            bus,
            subs,
            registry,
            endpoint,
            actions,
            state,
        }
    }

    /// Creates, starts and registers a stream.
    ///
    /// Returns once the worker answered its status probe and the id is visible
    /// to accessors. Fails with `DuplicateStream` if `id` is registered.
    pub async fn add_stream(
        &self,
        id: impl Into<String>,
        settings: impl Into<StreamSettings>,
    ) -> Result<(), StreamError> {
        self.submit(Action::Add {
            id: id.into(),
            settings: settings.into(),
        })
        .await
    }

    /// Unregisters a stream and reclaims its resources.
    ///
    /// Assumes the worker was already told to finish; returns after it exited.
    pub async fn remove_stream(&self, id: impl Into<String>) -> Result<(), StreamError> {
        self.submit(Action::Remove { id: id.into() }).await
    }

    /// Abandons a stream: unregister, discard further results, close.
    pub async fn disown_stream(&self, id: impl Into<String>) -> Result<(), StreamError> {
        self.submit(Action::Disown { id: id.into() }).await
    }

    /// Drains every stream with `exit_code` and stops the supervisor.
    ///
    /// Returns once the state is `Stopped`; calling it again is a no-op.
    pub async fn teardown(&self, exit_code: i32) -> Result<(), StreamError> {
        if self.state() == SupervisorState::Stopped {
            return Ok(());
        }
        match self.submit(Action::Teardown { exit_code }).await {
            Err(StreamError::SupervisorStopped) => {
                self.wait_stopped().await;
                Ok(())
            }
            other => other,
        }
    }

    /// Waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then runs [`Supervisor::teardown`].
    pub async fn teardown_on_signal(&self, exit_code: i32) -> Result<(), StreamError> {
        match shutdown::wait_for_exit_signal().await {
            Ok(signal) => tracing::info!(signal, "exit signal received"),
            Err(e) => tracing::warn!(error = %e, "signal registration failed; tearing down"),
        }
        self.teardown(exit_code).await
    }

    /// Point-in-time, sorted list of registered stream ids.
    pub async fn stream_ids(&self) -> Vec<String> {
        self.registry.list().await
    }

    /// Returns true if `id` is registered.
    pub async fn has_stream(&self, id: &str) -> bool {
        self.registry.contains(id).await
    }

    /// Returns the context of a registered stream.
    pub async fn get_stream(&self, id: &str) -> Result<Arc<StreamContext>, StreamError> {
        self.registry.get(id).await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Waits until the control loop reached `Stopped`.
    pub async fn wait_stopped(&self) {
        let mut rx = self.state.clone();
        let _ = rx.wait_for(|s| *s == SupervisorState::Stopped).await;
    }

    /// Sets the listening port handed to streams added from now on (`0` = none).
    pub fn set_port(&self, port: u16) {
        self.endpoint.set_port(port);
    }

    /// Sets the owner process watched for orphan detection (`0` = none).
    pub fn set_owner_pid(&self, pid: u32) {
        self.endpoint.set_owner_pid(pid);
    }

    /// Subscribes to runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Configuration the supervisor was built with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Number of subscribers receiving runtime events.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    async fn submit(&self, action: Action) -> Result<(), StreamError> {
        let (req, done) = ActionRequest::new(action);
        self.actions
            .send(req)
            .map_err(|_| StreamError::SupervisorStopped)?;
        done.wait().await
    }
}
