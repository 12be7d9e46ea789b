//! Listening port and owner pid, settable after the supervisor is built.
//!
//! Both values use `0` as the "unset" sentinel, like [`SupervisorConfig`](super::SupervisorConfig).

use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use crate::stream::Launch;

#[derive(Debug, Default)]
pub(crate) struct Endpoint {
    port: AtomicU16,
    owner_pid: AtomicU32,
}

impl Endpoint {
    pub fn new(port: Option<u16>, owner_pid: Option<u32>) -> Self {
        Self {
            port: AtomicU16::new(port.unwrap_or_default()),
            owner_pid: AtomicU32::new(owner_pid.unwrap_or_default()),
        }
    }

    pub fn set_port(&self, port: u16) {
        self.port.store(port, Ordering::Release);
    }

    pub fn set_owner_pid(&self, pid: u32) {
        self.owner_pid.store(pid, Ordering::Release);
    }

    pub fn owner_pid(&self) -> Option<u32> {
        match self.owner_pid.load(Ordering::Acquire) {
            0 => None,
            pid => Some(pid),
        }
    }

    pub fn port(&self) -> Option<u16> {
        match self.port.load(Ordering::Acquire) {
            0 => None,
            port => Some(port),
        }
    }

    /// Values handed to a newly started worker.
    pub fn launch(&self) -> Launch {
        Launch {
            port: self.port(),
            owner_pid: self.owner_pid(),
        }
    }
}
