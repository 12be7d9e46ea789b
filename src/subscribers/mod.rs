//! # Event subscribers.
//!
//! The [`Subscribe`] trait plugs custom handlers into the supervisor's event
//! stream; [`SubscriberSet`] fans events out to them without blocking the
//! control loop.
//!
//! ```text
//! ControlLoop / drain / WorkerHandle ── publish(Event) ──► Bus ──► listener
//!                                                                    │
//!                                                          SubscriberSet::emit
//!                                                                    │
//!                                                   ┌────────────────┼──────────┐
//!                                                   ▼                ▼          ▼
//!                                               LogWriter         Metrics     Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
