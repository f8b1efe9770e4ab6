/// RAM-backed stand-ins for the monitor's host dependencies.
///
/// `MockFlash` describes a device geometry and partition table without any
/// hardware, `ManualClock` is a clock the caller moves by hand, and
/// `MockProcessTable` records alarms instead of delivering signals. Used by
/// the unit tests, the integration tests and the simulator.
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;

use spin::Mutex;

use crate::device::{FlashDevice, Partition};
use crate::notify::{Pid, ProcessHandle, ProcessTable, Signal};
use crate::time::Clock;

/// Flash device that exists only as geometry.
pub struct MockFlash {
    page_size: u32,
    pages_per_block: u32,
    block_count: u32,
    partitions: Vec<Partition>,
}

impl MockFlash {
    pub fn new(block_count: u32, pages_per_block: u32, page_size: u32) -> Self {
        Self {
            page_size,
            pages_per_block,
            block_count,
            partitions: Vec::new(),
        }
    }

    /// Add a partition covering `block_count` blocks from `first_block`.
    pub fn with_partition(mut self, first_block: u32, block_count: u32) -> Self {
        let block_size = u64::from(self.page_size) * u64::from(self.pages_per_block);
        self.partitions.push(Partition {
            offset: u64::from(first_block) * block_size,
            size: u64::from(block_count) * block_size,
        });
        self
    }
}

impl FlashDevice for MockFlash {
    fn total_size(&self) -> u64 {
        u64::from(self.block_count) * u64::from(self.pages_per_block) * u64::from(self.page_size)
    }

    fn write_size(&self) -> u32 {
        self.page_size
    }

    fn erase_size(&self) -> u32 {
        self.page_size * self.pages_per_block
    }

    fn partition(&self, index: usize) -> Option<Partition> {
        self.partitions.get(index).copied()
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub const fn new() -> Self {
        Self {
            nanos: AtomicU64::new(0),
        }
    }

    pub fn set(&self, at: Duration) {
        self.nanos.store(at.as_nanos() as u64, Ordering::Release);
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::AcqRel);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}

/// Process table with a fixed set of live pids that counts alarms.
pub struct MockProcessTable {
    live: Mutex<Vec<Pid>>,
    alarms: AtomicU64,
}

impl MockProcessTable {
    pub fn new(live: &[Pid]) -> Self {
        Self {
            live: Mutex::new(live.to_vec()),
            alarms: AtomicU64::new(0),
        }
    }

    /// Make `pid` disappear, as if the process exited.
    pub fn exit(&self, pid: Pid) {
        self.live.lock().retain(|&p| p != pid);
    }

    /// Alarms delivered so far.
    pub fn alarms(&self) -> u64 {
        self.alarms.load(Ordering::Acquire)
    }
}

impl ProcessTable for MockProcessTable {
    fn find(&self, pid: Pid) -> Option<ProcessHandle> {
        self.live.lock().contains(&pid).then(|| ProcessHandle::new(pid))
    }

    /// Signals to a pid that has exited are lost, as with `kill`.
    fn signal(&self, process: ProcessHandle, signal: Signal) {
        if signal == Signal::Alarm && self.live.lock().contains(&process.pid()) {
            self.alarms.fetch_add(1, Ordering::AcqRel);
        }
    }
}
