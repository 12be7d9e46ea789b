//! # Global supervisor configuration.
//!
//! Provides [`SupervisorConfig`], centralized settings for the control loop,
//! the drain protocol and orphan detection.
//!
//! ## Sentinel values
//! - `startup_timeout = 0s` → unbounded status probe at stream start
//! - `owner_pid = 0` → no owner process (orphan detection disabled)
//! - `port = 0` → no listening port handed to workers

use std::time::Duration;

/// What the control loop does once the owner process is gone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// Stop immediately: every stream is detached and its worker cancelled, no drain.
    #[default]
    Abandon,
    /// Run the drain protocol with [`SupervisorConfig::orphan_exit_code`] before stopping.
    Drain,
}

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `orphan_check_interval`: minimum spacing between owner-process probes
/// - `action_timeout`: bounded wait for the next action, so orphan checks run without traffic
/// - `drain_poll_interval`: pause between poll-completion cycles during teardown
/// - `startup_timeout`: status probe limit at stream start (`0s` = unbounded)
/// - `orphan_policy` / `orphan_exit_code`: behavior once the owner is gone
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `owner_pid`: process whose disappearance stops the supervisor (`0` = none)
/// - `port`: listening port handed to every worker (`0` = none)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Minimum time between two owner-process liveness probes.
    pub orphan_check_interval: Duration,

    /// Maximum wait for the next action before the loop re-checks its stop conditions.
    pub action_timeout: Duration,

    /// Pause between two poll-completion cycles of the drain protocol.
    ///
    /// A stream pushing `ExitComplete` cuts the pause short.
    pub drain_poll_interval: Duration,

    /// Limit for the startup status probe.
    ///
    /// - `Duration::ZERO` = unbounded (a worker that never answers blocks `add`)
    /// - `> 0` = `add` fails with `WorkerStartupTimeout`
    pub startup_timeout: Duration,

    /// Behavior once the owner process is gone.
    pub orphan_policy: OrphanPolicy,

    /// Exit code sent to streams when [`OrphanPolicy::Drain`] is in effect.
    pub orphan_exit_code: i32,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Owner process id (`0` = none).
    pub owner_pid: u32,

    /// Listening port handed to workers (`0` = none).
    pub port: u16,
}

impl SupervisorConfig {
    /// Returns the startup probe limit as an `Option`.
    #[inline]
    pub fn startup_limit(&self) -> Option<Duration> {
        if self.startup_timeout == Duration::ZERO {
            None
        } else {
            Some(self.startup_timeout)
        }
    }

    /// Returns the owner pid as an `Option`.
    #[inline]
    pub fn owner(&self) -> Option<u32> {
        (self.owner_pid != 0).then_some(self.owner_pid)
    }

    /// Returns the listening port as an `Option`.
    #[inline]
    pub fn listening_port(&self) -> Option<u16> {
        (self.port != 0).then_some(self.port)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `orphan_check_interval = 2s`
    /// - `action_timeout = 1s`
    /// - `drain_poll_interval = 100ms`
    /// - `startup_timeout = 0s` (unbounded)
    /// - `orphan_policy = Abandon`, `orphan_exit_code = 1`
    /// - `bus_capacity = 1024`
    /// - `owner_pid = 0`, `port = 0`
    fn default() -> Self {
        Self {
            orphan_check_interval: Duration::from_secs(2),
            action_timeout: Duration::from_secs(1),
            drain_poll_interval: Duration::from_millis(100),
            startup_timeout: Duration::ZERO,
            orphan_policy: OrphanPolicy::default(),
            orphan_exit_code: 1,
            bus_capacity: 1024,
            owner_pid: 0,
            port: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_map_to_none() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.startup_limit(), None);
        assert_eq!(cfg.owner(), None);
        assert_eq!(cfg.listening_port(), None);
        assert_eq!(cfg.orphan_policy, OrphanPolicy::Abandon);
    }

    #[test]
    fn test_non_zero_values_are_kept() {
        let cfg = SupervisorConfig {
            startup_timeout: Duration::from_secs(5),
            owner_pid: 42,
            port: 8080,
            bus_capacity: 0,
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.startup_limit(), Some(Duration::from_secs(5)));
        assert_eq!(cfg.owner(), Some(42));
        assert_eq!(cfg.listening_port(), Some(8080));
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
