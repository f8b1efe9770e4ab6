/// Bounded event log: a circular buffer that overwrites its oldest entry.
///
/// Layout: `size + 1` slots and two indices, `start` (oldest retained event)
/// and `end` (next slot to write). One slot always stays unused so that
/// `start == end` means empty and `(end + 1) % C == start` means full.
///
/// Producers never wait for the consumer: inserting into a full log drops
/// the oldest event. Slots that were never written, or were cleared by a
/// reset, hold `None` and end a read session.
///
/// Locking: one spin `Mutex` covers the indices and the slots. Producers
/// hold it for one slot copy plus the index update. Readers hold it only
/// to copy a single record out; formatting happens after it is released.
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::time::Duration;

use spin::Mutex;

use crate::error::InitError;
use crate::event::{EventKind, EventRecord};
use crate::proc::{self, PageWriter, ReadOutcome};
use crate::task::TaskName;
use crate::time::{Clock, ZeroTime};

struct Ring {
    slots: Box<[Option<EventRecord>]>,
    start: usize,
    end: usize,
}

impl Ring {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn len(&self) -> usize {
        (self.end + self.capacity() - self.start) % self.capacity()
    }

    fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn is_full(&self) -> bool {
        (self.end + 1) % self.capacity() == self.start
    }

    fn push(&mut self, record: EventRecord) {
        self.slots[self.end] = Some(record);
        self.end = (self.end + 1) % self.capacity();
        if self.end == self.start {
            self.start = (self.start + 1) % self.capacity();
        }
    }

    fn clear(&mut self) {
        self.start = 0;
        self.end = 0;
        self.slots.fill(None);
    }

    /// Record `offset` positions after the oldest one, if it was produced.
    fn get(&self, offset: usize) -> Option<EventRecord> {
        if offset >= self.len() {
            return None;
        }
        self.slots[(self.start + offset) % self.capacity()]
    }
}

pub struct EventLog {
    ring: Mutex<Ring>,
    zero: ZeroTime,
    log_task: bool,
}

impl EventLog {
    /// Allocate a log that retains up to `size` events.
    ///
    /// `zero` is the initial zero instant, normally the clock's current
    /// time. With `log_task` off, task names are dropped on insert and the
    /// task field is left out of every serialized line.
    pub fn new(size: usize, log_task: bool, zero: Duration) -> Result<Self, InitError> {
        if size == 0 {
            return Err(InitError::EmptyLog);
        }
        let capacity = size
            .checked_add(1)
            .ok_or(InitError::OutOfMemory { what: "event log", count: size })?;

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| InitError::OutOfMemory { what: "event log", count: capacity })?;
        slots.resize(capacity, None);

        Ok(Self {
            ring: Mutex::new(Ring {
                slots: slots.into_boxed_slice(),
                start: 0,
                end: 0,
            }),
            zero: ZeroTime::new(zero),
            log_task,
        })
    }

    /// Maximum number of retained events (one less than the slot count).
    pub fn size(&self) -> usize {
        self.ring.lock().capacity() - 1
    }

    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.lock().is_full()
    }

    pub fn log_task(&self) -> bool {
        self.log_task
    }

    pub fn zero_time(&self) -> Duration {
        self.zero.get()
    }

    /// Append `record`, discarding the oldest event if the log is full.
    pub fn insert(&self, mut record: EventRecord) {
        if !self.log_task {
            record.task = None;
        }
        self.ring.lock().push(record);
    }

    /// Stamp and append an event in one critical section, so slot order
    /// always matches timestamp order across concurrent producers.
    pub fn insert_now(&self, clock: &dyn Clock, kind: EventKind, address: u64, task: Option<TaskName>) {
        let task = if self.log_task { task } else { None };
        let mut ring = self.ring.lock();
        ring.push(EventRecord {
            timestamp: clock.now(),
            kind,
            address,
            task,
        });
    }

    /// Empty the log and clear every slot.
    pub fn reset(&self) {
        self.ring.lock().clear();
    }

    /// Empty the log and move the zero instant to `now`.
    ///
    /// Both happen under the log lock: no event can land between the clear
    /// and the rebase with a timestamp from the old epoch.
    pub fn rebase(&self, now: Duration) {
        let mut ring = self.ring.lock();
        ring.clear();
        self.zero.rebase(now);
    }

    /// Copy of the event `offset` positions after the oldest retained one.
    pub fn get(&self, offset: usize) -> Option<EventRecord> {
        self.ring.lock().get(offset)
    }

    /// A record and the zero instant it is relative to, read under one lock
    /// so a concurrent `rebase` cannot pair a new record with an old zero.
    fn get_with_zero(&self, offset: usize) -> Option<(EventRecord, Duration)> {
        let ring = self.ring.lock();
        let record = ring.get(offset)?;
        Some((record, self.zero.get()))
    }

    /// Serialize events starting `cursor` positions after the oldest one.
    ///
    /// Lines are `"<sec>.<nsec>;<R|W|E|C>;<address>[;<task>]\n"` with time
    /// relative to the zero instant. Stops at the first unwritten slot, at
    /// the newest event, or before the first line that does not fit. The
    /// returned `next` is the cursor for the following call.
    pub fn read_session(&self, cursor: u64, buf: &mut [u8]) -> ReadOutcome {
        let mut page = PageWriter::new(buf);
        let mut offset = cursor;
        loop {
            let entry = usize::try_from(offset)
                .ok()
                .and_then(|offset| self.get_with_zero(offset));
            let Some((record, zero)) = entry else {
                return page.finish(cursor, offset, true);
            };

            // Events stamped before a rebase clamp to zero.
            let since_zero = record.timestamp.saturating_sub(zero);
            if !page.push(proc::event_line(&record, since_zero, self.log_task).as_bytes()) {
                return page.finish(cursor, offset, false);
            }
            offset += 1;
        }
    }
}
