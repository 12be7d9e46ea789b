//! Runtime core: control plane and lifecycle.
//!
//! The public API from this module is [`Supervisor`] (with its builder, config
//! and state). Everything else is wiring behind it.
//!
//! Internal modules:
//! - [`action`]: action requests and their completion signal;
//! - [`control`]: the control loop, sole writer of the registry;
//! - [`drain`]: coordinated finish/poll/close of many streams;
//! - [`orphan`]: throttled owner-process liveness check;
//! - [`registry`]: the id → stream context map;
//! - [`shutdown`]: process exit signal handling.

mod action;
mod builder;
mod config;
mod control;
mod drain;
mod endpoint;
mod orphan;
mod registry;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::{OrphanPolicy, SupervisorConfig};
pub use registry::Registry;
pub use supervisor::{Supervisor, SupervisorState};
