//! # Owner-process liveness check.
//!
//! The control loop calls [`OrphanWatch::check`] on every iteration; the probe
//! itself runs at most once per `orphan_check_interval`.
//!
//! ## Rules
//! - No owner pid configured → never orphaned.
//! - The probe failing for any reason other than "no such process" counts as alive.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::endpoint::Endpoint;

pub(crate) struct OrphanWatch {
    endpoint: Arc<Endpoint>,
    interval: Duration,
    last_checked: Option<Instant>,
}

impl OrphanWatch {
    pub fn new(endpoint: Arc<Endpoint>, interval: Duration) -> Self {
        Self {
            endpoint,
            interval,
            last_checked: None,
        }
    }

    /// Returns true if the owner process is known to be gone.
    pub fn check(&mut self) -> bool {
        let Some(pid) = self.endpoint.owner_pid() else {
            return false;
        };
        let now = Instant::now();
        if self
            .last_checked
            .is_some_and(|last| now < last + self.interval)
        {
            return false;
        }
        self.last_checked = Some(now);
        !process_exists(pid)
    }
}

/// Returns false only when the OS reports that `pid` does not exist.
#[cfg(unix)]
pub(crate) fn process_exists(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return true;
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        Err(_) => true,
    }
}

/// Returns false only when the OS reports that `pid` does not exist.
#[cfg(not(unix))]
pub(crate) fn process_exists(_pid: u32) -> bool {
    true
}
