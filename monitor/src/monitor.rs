/// The monitor context.
///
/// One `Monitor` owns the counter table, the event log, the control flags
/// and the notifier for one traced device. It is built once from the
/// device geometry and configuration, shared by reference with every
/// producer and with the control files, and torn down with `shutdown`.
///
/// Producers reach it two ways:
/// - the raw `EventSink` interface (`insert_event`, `record_access`), one
///   notification per accepted call;
/// - the probe operations (`page_read`, `page_write`, `block_erase`,
///   `cache_hit`, `read_range`) that a driver shim calls once per physical
///   operation. They do page/block arithmetic, apply the traced-partition
///   filter, update counters and log together, and notify once.
///
/// Neither path allocates, blocks on the consumer, or reports failure to
/// its caller. Dropped input is reported through diagnostics.
use alloc::boxed::Box;

use crate::config::MonitorConfig;
use crate::control::{ControlFlags, ControlState};
use crate::counters::BlockCounters;
use crate::device::{FlashDevice, FlashGeometry, TracedPartition};
use crate::error::InitError;
use crate::event::{AccessKind, EventKind};
use crate::notify::{Notifier, ProcessTable};
use crate::proc::{CounterFile, LogFile};
use crate::ring::EventLog;
use crate::task::TaskName;
use crate::time::Clock;

/// Entry points for whatever observes the flash operations.
pub trait EventSink {
    /// Log one event. `address` is a page index, or a block index for
    /// erases. Returns whether the event was accepted by the gate.
    fn insert_event(&self, kind: EventKind, address: u64, task: Option<&str>) -> bool;

    /// Count one access to `block`. Returns whether it was counted.
    fn record_access(&self, kind: AccessKind, block: u32) -> bool;
}

pub struct Monitor {
    geometry: FlashGeometry,
    traced: Option<TracedPartition>,
    control: ControlState,
    counters: BlockCounters,
    log: Option<EventLog>,
    notifier: Notifier,
    clock: Box<dyn Clock>,
    log_cache_hits: bool,
}

impl Monitor {
    /// Build a monitor for `device`.
    ///
    /// Bad geometry or a failed allocation aborts construction. An unknown
    /// traced partition or a missing observer only disables that feature.
    pub fn new(
        device: &dyn FlashDevice,
        config: &MonitorConfig,
        clock: Box<dyn Clock>,
        processes: Box<dyn ProcessTable>,
    ) -> Result<Self, InitError> {
        let geometry = FlashGeometry::from_device(device)?;
        let counters = BlockCounters::new(geometry.block_count())?;

        let log = match config.log_size {
            0 => {
                tracing::info!("event log disabled");
                None
            }
            size => {
                let log = EventLog::new(size, config.log_task, clock.now())?;
                tracing::info!(
                    entries = size,
                    entry_bytes = core::mem::size_of::<Option<crate::event::EventRecord>>(),
                    log_task = config.log_task,
                    "event log allocated"
                );
                Some(log)
            }
        };

        let traced = config.traced_partition.and_then(|index| {
            match TracedPartition::resolve(device, &geometry, index) {
                Some(part) => {
                    tracing::info!(
                        index,
                        offset = part.offset,
                        size = part.size,
                        first_block = part.blocks().start,
                        last_block = part.blocks().end,
                        "tracing one partition"
                    );
                    Some(part)
                }
                None => {
                    tracing::warn!(index, "traced partition not found, tracing all partitions");
                    None
                }
            }
        });
        if traced.is_none() {
            tracing::info!("all partitions traced");
        }

        let mut flags = ControlFlags::MONITORING;
        if log.is_some() {
            flags |= ControlFlags::LOGGING;
        }

        Ok(Self {
            geometry,
            traced,
            control: ControlState::new(flags),
            counters,
            log,
            notifier: Notifier::new(config.observer_pid, processes),
            clock,
            log_cache_hits: config.log_cache_hits,
        })
    }

    pub fn geometry(&self) -> &FlashGeometry {
        &self.geometry
    }

    pub fn traced_partition(&self) -> Option<&TracedPartition> {
        self.traced.as_ref()
    }

    pub fn flags(&self) -> ControlFlags {
        self.control.flags()
    }

    pub fn counters(&self) -> &BlockCounters {
        &self.counters
    }

    /// The event log, unless it was disabled at start-up.
    pub fn log(&self) -> Option<&EventLog> {
        self.log.as_ref()
    }

    /// The counter control file (`flashmon`).
    pub fn counter_file(&self) -> CounterFile<'_> {
        CounterFile::new(self)
    }

    /// The event log control file (`flashmon_log`), if logging was
    /// configured.
    pub fn log_file(&self) -> Option<LogFile<'_>> {
        self.log.as_ref().map(|log| LogFile::new(self, log))
    }

    pub(crate) fn control(&self) -> &ControlState {
        &self.control
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    /// Range the counter file serves: the traced partition, or everything.
    pub(crate) fn counter_range(&self) -> Option<core::ops::Range<u32>> {
        self.traced.map(|part| part.blocks())
    }

    /// Tear the monitor down. Borrowed control files cannot outlive it.
    pub fn shutdown(self) {
        if let Some(log) = &self.log {
            tracing::info!(retained = log.len(), "dumping event log");
        }
        tracing::info!("flashmon stopped");
    }

    // ---- Probe operations ----

    /// A page read that reached the flash array.
    pub fn page_read(&self, page: u64, task: Option<&str>) -> bool {
        self.page_access(AccessKind::Read, page, task)
    }

    /// A page program.
    pub fn page_write(&self, page: u64, task: Option<&str>) -> bool {
        self.page_access(AccessKind::Write, page, task)
    }

    /// A block erase.
    pub fn block_erase(&self, block: u64, task: Option<&str>) -> bool {
        if !self.monitoring() || !self.traced_offset(self.geometry.block_offset(block)) {
            return false;
        }
        let Some(idx) = self.block_index(block) else {
            return false;
        };
        self.counters.record_access(AccessKind::Erase, idx);
        self.log_event(EventKind::Erase, block, task);
        self.notifier.notify();
        true
    }

    /// A page read served from the driver's page buffer. Only logged when
    /// cache hits are configured to be; never counted.
    pub fn cache_hit(&self, page: u64, task: Option<&str>) -> bool {
        if !self.log_cache_hits
            || !self.monitoring()
            || !self.traced_offset(self.geometry.page_offset(page))
            || !self.page_in_range(page)
        {
            return false;
        }
        self.log_event(EventKind::CacheHit, page, task);
        self.notifier.notify();
        true
    }

    /// A read of `len` bytes from device offset `offset`, possibly spanning
    /// several pages. `cached_page` is the page currently held in the
    /// driver's page buffer; it is reported as a cache hit, not a read.
    ///
    /// Returns the number of pages counted as reads.
    pub fn read_range(&self, offset: u64, len: u64, cached_page: Option<u64>, task: Option<&str>) -> u64 {
        if len == 0 || !self.monitoring() || !self.traced_offset(offset) {
            return 0;
        }
        let page_size = u64::from(self.geometry.page_size());
        let first = offset / page_size;
        let last = offset.saturating_add(len - 1) / page_size;

        let mut counted = 0;
        let mut hits = 0;
        for page in first..=last {
            if !self.page_in_range(page) {
                break;
            }
            if cached_page == Some(page) {
                if self.log_cache_hits {
                    self.log_event(EventKind::CacheHit, page, task);
                    hits += 1;
                }
                continue;
            }
            let block = self.geometry.block_of_page(page) as u32;
            self.counters.record_access(AccessKind::Read, block);
            self.log_event(EventKind::Read, page, task);
            counted += 1;
        }
        if counted + hits > 0 {
            self.notifier.notify();
        }
        counted
    }

    fn page_access(&self, kind: AccessKind, page: u64, task: Option<&str>) -> bool {
        if !self.monitoring()
            || !self.traced_offset(self.geometry.page_offset(page))
            || !self.page_in_range(page)
        {
            return false;
        }
        let block = self.geometry.block_of_page(page) as u32;
        self.counters.record_access(kind, block);
        self.log_event(kind.into(), page, task);
        self.notifier.notify();
        true
    }

    // ---- Gate helpers ----

    fn monitoring(&self) -> bool {
        self.control.is_enabled(ControlFlags::MONITORING)
    }

    fn traced_offset(&self, offset: u64) -> bool {
        self.traced.map_or(true, |part| part.contains_offset(offset))
    }

    fn page_in_range(&self, page: u64) -> bool {
        if page < self.geometry.page_count() {
            return true;
        }
        tracing::warn!(page, pages = self.geometry.page_count(), "accessed page out of range");
        false
    }

    fn block_index(&self, block: u64) -> Option<u32> {
        match u32::try_from(block) {
            Ok(idx) if idx < self.geometry.block_count() => Some(idx),
            _ => {
                tracing::warn!(block, blocks = self.geometry.block_count(), "accessed block out of range");
                None
            }
        }
    }

    fn address_in_range(&self, kind: EventKind, address: u64) -> bool {
        if kind.addresses_pages() {
            self.page_in_range(address)
        } else {
            self.block_index(address).is_some()
        }
    }

    /// Append to the log if it exists and logging is on.
    fn log_event(&self, kind: EventKind, address: u64, task: Option<&str>) {
        let Some(log) = &self.log else {
            return;
        };
        if !self.control.is_enabled(ControlFlags::LOGGING) {
            return;
        }
        let task = if log.log_task() { task.map(TaskName::new) } else { None };
        log.insert_now(&*self.clock, kind, address, task);
    }
}

impl EventSink for Monitor {
    fn insert_event(&self, kind: EventKind, address: u64, task: Option<&str>) -> bool {
        if !self.monitoring() || !self.address_in_range(kind, address) {
            return false;
        }
        self.log_event(kind, address, task);
        self.notifier.notify();
        true
    }

    fn record_access(&self, kind: AccessKind, block: u32) -> bool {
        if !self.monitoring() || !self.counters.record_access(kind, block) {
            return false;
        }
        self.notifier.notify();
        true
    }
}
