//! Flashmon: flash access monitor core.
//!
//! Observes page reads, page writes, block erases and cache hits on a flash
//! device, keeps per-block access counters and a bounded event log, and
//! exposes both through a chunked text protocol that a consumer pages
//! through at its own pace.
//!
//! Everything here runs without `std`. The producer side (`EventSink`, the
//! probe operations on `Monitor`) never allocates and only takes short spin
//! critical sections, so it can be called inline with the I/O it observes.
#![no_std]

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod config;
pub mod control;
pub mod counters;
pub mod device;
pub mod error;
pub mod event;
pub mod mock;
pub mod monitor;
pub mod notify;
pub mod proc;
pub mod ring;
pub mod task;
pub mod time;
pub mod workload;

#[cfg(feature = "std")]
pub mod host;

pub use config::MonitorConfig;
pub use control::{Command, ControlFlags, ControlState};
pub use counters::{BlockCount, BlockCounters};
pub use device::{FlashDevice, FlashGeometry, Partition, TracedPartition};
pub use error::{CommandError, ConfigError, InitError};
pub use event::{AccessKind, EventKind, EventRecord};
pub use monitor::{EventSink, Monitor};
pub use notify::{Notifier, Pid, ProcessHandle, ProcessTable, Signal};
pub use proc::{CounterFile, LogFile, ProcFile, ReadOutcome, ReadStatus};
pub use ring::EventLog;
pub use task::TaskName;
pub use time::{Clock, ZeroTime};
pub use workload::{FlashOp, Mix, Workload};
