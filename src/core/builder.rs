use std::sync::Arc;

use tokio::sync::{
    broadcast::{
        self,
        error::{RecvError, TryRecvError},
    },
    mpsc, watch,
};

use crate::{
    core::SupervisorConfig,
    events::{Bus, Event},
    stream::WorkerRef,
    subscribers::{Subscribe, SubscriberSet},
};

use super::{
    control::ControlLoop,
    endpoint::Endpoint,
    registry::Registry,
    supervisor::{Supervisor, SupervisorState},
};

/// Builder for constructing a Supervisor.
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    worker: WorkerRef,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration and worker entry point.
    pub fn new(cfg: SupervisorConfig, worker: WorkerRef) -> Self {
        Self {
            cfg,
            worker,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the worker entry point.
    pub fn with_worker(mut self, worker: WorkerRef) -> Self {
        self.worker = worker;
        self
    }

    /// Watches `pid`; once it is gone the supervisor stops on its own.
    pub fn with_owner_pid(mut self, pid: u32) -> Self {
        self.cfg.owner_pid = pid;
        self
    }

    /// Hands `port` to every worker.
    pub fn with_port(mut self, port: u16) -> Self {
        self.cfg.port = port;
        self
    }

    /// Builds the Supervisor and spawns its control loop.
    ///
    /// Must be called from within a tokio runtime. Initializes:
    /// - Event bus and subscriber workers (plus the listener feeding them)
    /// - Registry and action queue
    /// - The control loop task
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let (state_tx, state_rx) = watch::channel(SupervisorState::Running);
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        spawn_subscriber_listener(&bus, Arc::clone(&subs), state_rx.clone());

        let registry = Arc::new(Registry::new());
        let endpoint = Arc::new(Endpoint::new(
            self.cfg.listening_port(),
            self.cfg.owner(),
        ));
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();

        let control = ControlLoop {
            cfg: self.cfg.clone(),
            bus: bus.clone(),
            registry: Arc::clone(&registry),
            endpoint: Arc::clone(&endpoint),
            worker: self.worker,
            actions: actions_rx,
            state: state_tx,
        };
        tokio::spawn(control.run());

        Arc::new(Supervisor::new_internal(
            self.cfg, bus, subs, registry, endpoint, actions_tx, state_rx,
        ))
    }
}

/// Forwards bus events to the subscriber set until the supervisor stops.
///
/// Events already on the bus when `Stopped` is observed are still delivered.
fn spawn_subscriber_listener(
    bus: &Bus,
    set: Arc<SubscriberSet>,
    mut state: watch::Receiver<SupervisorState>,
) {
    if set.is_empty() {
        return;
    }
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                changed = state.changed() => {
                    let stopped = changed.is_err()
                        || *state.borrow_and_update() == SupervisorState::Stopped;
                    if stopped {
                        forward_remaining(&mut rx, &set);
                        break;
                    }
                }
            }
        }
    });
}

fn forward_remaining(rx: &mut broadcast::Receiver<Event>, set: &SubscriberSet) {
    loop {
        match rx.try_recv() {
            Ok(ev) => set.emit(&ev),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}
