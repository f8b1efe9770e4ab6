/// Observer notification.
///
/// One external process may ask to be poked on every accepted event. The
/// poke is a payload-less alarm signal, delivered fire-and-forget: no reply
/// is awaited, nothing is retried, and a missing observer only produces a
/// warning. Monitoring carries on regardless.
use alloc::boxed::Box;
use alloc::sync::Arc;

/// Process identifier as the host OS knows it. Zero means "none".
pub type Pid = u32;

/// A process that was alive when it was looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    pid: Pid,
}

impl ProcessHandle {
    pub const fn new(pid: Pid) -> Self {
        Self { pid }
    }

    pub const fn pid(&self) -> Pid {
        self.pid
    }
}

/// Signals the monitor can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Signal {
    /// `SIGALRM`.
    Alarm = 14,
}

/// Host process lookup and signal delivery.
///
/// Both methods run on the producer path and must neither block nor
/// allocate.
pub trait ProcessTable: Send + Sync {
    /// Resolve `pid` to a live process.
    fn find(&self, pid: Pid) -> Option<ProcessHandle>;

    /// Deliver `signal` to `process`. Failures are ignored.
    fn signal(&self, process: ProcessHandle, signal: Signal);
}

impl<P: ProcessTable> ProcessTable for Arc<P> {
    fn find(&self, pid: Pid) -> Option<ProcessHandle> {
        (**self).find(pid)
    }

    fn signal(&self, process: ProcessHandle, signal: Signal) {
        (**self).signal(process, signal)
    }
}

/// Process table for hosts without processes to notify.
pub struct NoProcesses;

impl ProcessTable for NoProcesses {
    fn find(&self, _pid: Pid) -> Option<ProcessHandle> {
        None
    }

    fn signal(&self, _process: ProcessHandle, _signal: Signal) {}
}

pub struct Notifier {
    observer: Pid,
    processes: Box<dyn ProcessTable>,
}

impl Notifier {
    /// Notifier for `observer` (0 disables notification).
    ///
    /// An observer that cannot be found at start-up is treated as a
    /// configuration mistake: notification is turned off with a warning.
    pub fn new(observer: Pid, processes: Box<dyn ProcessTable>) -> Self {
        let observer = match observer {
            0 => {
                tracing::info!("no observer pid, notifications disabled");
                0
            }
            pid if processes.find(pid).is_none() => {
                tracing::warn!(pid, "observer process not found, notifications disabled");
                0
            }
            pid => pid,
        };
        Self { observer, processes }
    }

    /// The observer that will be notified, if any.
    pub fn observer(&self) -> Option<Pid> {
        (self.observer != 0).then_some(self.observer)
    }

    /// Signal the observer once.
    pub fn notify(&self) {
        if self.observer == 0 {
            return;
        }
        match self.processes.find(self.observer) {
            Some(process) => self.processes.signal(process, Signal::Alarm),
            None => tracing::warn!(pid = self.observer, "observer process not found"),
        }
    }
}
