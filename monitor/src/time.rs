/// Event timestamps and the rebaseable zero instant.
///
/// A `Clock` hands out raw monotonic time as a `Duration` since its own
/// origin. Nothing leaves the monitor in raw form: the zero instant is
/// subtracted first, and `timereset` moves that instant to "now".
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;

/// Monotonic time source for event timestamps.
///
/// Called on the producer path, so implementations must not block or
/// allocate.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// Lets a test keep a handle on a clock it moves by hand.
impl<C: Clock> Clock for Arc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Reference instant subtracted from raw timestamps.
///
/// Stored as nanoseconds in an atomic so readers never need the log lock
/// to resolve a timestamp.
pub struct ZeroTime {
    nanos: AtomicU64,
}

impl ZeroTime {
    pub fn new(at: Duration) -> Self {
        Self {
            nanos: AtomicU64::new(to_nanos(at)),
        }
    }

    /// Move the zero instant.
    pub fn rebase(&self, at: Duration) {
        self.nanos.store(to_nanos(at), Ordering::Release);
    }

    /// The current zero instant, in raw clock time.
    pub fn get(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}

/// Saturates after ~584 years of uptime.
fn to_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
