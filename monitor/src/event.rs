/// Event kinds and the record stored in each log slot.
use core::time::Duration;

use crate::task::TaskName;

/// Kind of a logged flash event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Page read that reached the flash array.
    Read,
    /// Page program.
    Write,
    /// Block erase.
    Erase,
    /// Page read served from the driver's page buffer.
    CacheHit,
}

impl EventKind {
    /// Single-letter code used in the log line format.
    pub const fn code(self) -> char {
        match self {
            EventKind::Read => 'R',
            EventKind::Write => 'W',
            EventKind::Erase => 'E',
            EventKind::CacheHit => 'C',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'R' => Some(EventKind::Read),
            'W' => Some(EventKind::Write),
            'E' => Some(EventKind::Erase),
            'C' => Some(EventKind::CacheHit),
            _ => None,
        }
    }

    /// Whether `address` counts pages (as opposed to blocks).
    pub const fn addresses_pages(self) -> bool {
        !matches!(self, EventKind::Erase)
    }
}

/// Kind of a counted block access. Cache hits never touch the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
    Erase,
}

impl From<AccessKind> for EventKind {
    fn from(kind: AccessKind) -> Self {
        match kind {
            AccessKind::Read => EventKind::Read,
            AccessKind::Write => EventKind::Write,
            AccessKind::Erase => EventKind::Erase,
        }
    }
}

/// One captured event.
///
/// `timestamp` is raw clock time; the log subtracts its zero instant when
/// serializing. `address` is a page index, or a block index for erases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub timestamp: Duration,
    pub kind: EventKind,
    pub address: u64,
    pub task: Option<TaskName>,
}

// Slots are copied out under the log lock; keep them small.
static_assertions::const_assert!(core::mem::size_of::<Option<EventRecord>>() <= 64);

impl EventRecord {
    pub fn new(timestamp: Duration, kind: EventKind, address: u64) -> Self {
        Self {
            timestamp,
            kind,
            address,
            task: None,
        }
    }

    pub fn with_task(mut self, task: TaskName) -> Self {
        self.task = Some(task);
        self
    }
}
