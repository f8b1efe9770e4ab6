/// Per-block access counters.
///
/// Three parallel arrays indexed by block number. Producers bump a counter
/// with a relaxed atomic add under the shared side of a spin `RwLock`.
/// Readers hold the shared side for a whole page and only `reset` takes the
/// exclusive side, so a page is never half-zeroed and producers never wait
/// on each other.
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ops::Range;
use core::sync::atomic::{AtomicU32, Ordering};

use spin::RwLock;

use crate::error::InitError;
use crate::event::AccessKind;
use crate::proc::{self, PageWriter, ReadOutcome};

/// Snapshot of one block's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCount {
    pub reads: u32,
    pub writes: u32,
    pub erases: u32,
}

pub struct BlockCounters {
    reads: Box<[AtomicU32]>,
    writes: Box<[AtomicU32]>,
    erases: Box<[AtomicU32]>,
    /// Shared: producers and readers. Exclusive: reset.
    gate: RwLock<()>,
}

impl BlockCounters {
    /// Allocate zeroed counters for `block_count` blocks.
    pub fn new(block_count: u32) -> Result<Self, InitError> {
        Ok(Self {
            reads: zeroed(block_count as usize)?,
            writes: zeroed(block_count as usize)?,
            erases: zeroed(block_count as usize)?,
            gate: RwLock::new(()),
        })
    }

    pub fn block_count(&self) -> u32 {
        self.reads.len() as u32
    }

    /// Count one access to `block`.
    ///
    /// An index past the end is dropped with a warning and returns false.
    /// Counters wrap on overflow.
    pub fn record_access(&self, kind: AccessKind, block: u32) -> bool {
        let idx = block as usize;
        if idx >= self.reads.len() {
            tracing::warn!(block, blocks = self.reads.len(), ?kind, "accessed block out of range");
            return false;
        }

        let _shared = self.gate.read();
        let table = match kind {
            AccessKind::Read => &self.reads,
            AccessKind::Write => &self.writes,
            AccessKind::Erase => &self.erases,
        };
        table[idx].fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Zero every counter.
    pub fn reset(&self) {
        let _exclusive = self.gate.write();
        for table in [&self.reads, &self.writes, &self.erases] {
            for counter in table.iter() {
                counter.store(0, Ordering::Relaxed);
            }
        }
    }

    /// Counters for `block`, or None past the end.
    pub fn get(&self, block: u32) -> Option<BlockCount> {
        let idx = block as usize;
        if idx >= self.reads.len() {
            return None;
        }
        let _shared = self.gate.read();
        Some(self.load(idx))
    }

    /// Serialize counters as `"<reads> <writes> <erases>\n"` lines.
    ///
    /// `cursor` is an absolute block number. With `range`, only blocks in
    /// that sub-range are served and a cursor before it starts at its first
    /// block. Lines are never split: serialization stops before the first
    /// line that would overflow `buf`.
    pub fn read_page(&self, cursor: u64, buf: &mut [u8], range: Option<Range<u32>>) -> ReadOutcome {
        let count = self.block_count();
        let (first, end) = match range {
            Some(r) => (r.start, r.end.min(count)),
            None => (0, count),
        };

        let mut page = PageWriter::new(buf);
        let mut block = cursor.max(u64::from(first));
        // Held for the whole page so a reset lands before or after it.
        let _shared = self.gate.read();
        while block < u64::from(end) {
            if !page.push(proc::counter_line(self.load(block as usize)).as_bytes()) {
                return page.finish(cursor, block, false);
            }
            block += 1;
        }
        page.finish(cursor, block, true)
    }

    fn load(&self, idx: usize) -> BlockCount {
        BlockCount {
            reads: self.reads[idx].load(Ordering::Relaxed),
            writes: self.writes[idx].load(Ordering::Relaxed),
            erases: self.erases[idx].load(Ordering::Relaxed),
        }
    }
}

fn zeroed(len: usize) -> Result<Box<[AtomicU32]>, InitError> {
    let mut table = Vec::new();
    table
        .try_reserve_exact(len)
        .map_err(|_| InitError::OutOfMemory { what: "block counters", count: len })?;
    table.extend((0..len).map(|_| AtomicU32::new(0)));
    Ok(table.into_boxed_slice())
}
