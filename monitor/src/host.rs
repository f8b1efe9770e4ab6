/// Host integration for running the monitor as an ordinary process.
///
/// `HostClock` timestamps events with the OS monotonic clock;
/// `SignalProcessTable` notifies a real observer with `SIGALRM`.
use core::time::Duration;
use std::time::Instant;

use crate::notify::{Pid, ProcessHandle, ProcessTable, Signal};
use crate::time::Clock;

/// Monotonic clock measured from when it was created.
pub struct HostClock {
    origin: Instant,
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for HostClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Unix process table: `kill(pid, 0)` to look up, `kill(pid, sig)` to
/// deliver.
#[cfg(unix)]
pub struct SignalProcessTable;

#[cfg(unix)]
impl ProcessTable for SignalProcessTable {
    fn find(&self, pid: Pid) -> Option<ProcessHandle> {
        let raw = libc::pid_t::try_from(pid).ok().filter(|&p| p > 0)?;
        // Safety: signal 0 performs only the existence and permission check.
        let alive = unsafe { libc::kill(raw, 0) } == 0;
        alive.then(|| ProcessHandle::new(pid))
    }

    fn signal(&self, process: ProcessHandle, signal: Signal) {
        let Ok(raw) = libc::pid_t::try_from(process.pid()) else {
            return;
        };
        // Safety: kill has no memory-safety preconditions. ESRCH from an
        // observer that exited meanwhile is ignored.
        unsafe {
            libc::kill(raw, signal as libc::c_int);
        }
    }
}
