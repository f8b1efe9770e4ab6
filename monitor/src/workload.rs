/// Synthetic flash workload.
///
/// Generates a weighted random mix of page reads, page writes, block erases
/// and cache hits over a device geometry and feeds them to an `EventSink`.
/// Stands in for a real driver shim in tests, benches and the simulator.
use rand_core::RngCore;

use crate::device::FlashGeometry;
use crate::event::{AccessKind, EventKind};
use crate::monitor::EventSink;

/// One generated flash operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
    PageRead { page: u64 },
    PageWrite { page: u64 },
    BlockErase { block: u64 },
    CacheHit { page: u64 },
}

/// Relative weights of each operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mix {
    pub read: u32,
    pub write: u32,
    pub erase: u32,
    pub cache_hit: u32,
}

impl Default for Mix {
    fn default() -> Self {
        Self {
            read: 70,
            write: 20,
            erase: 5,
            cache_hit: 5,
        }
    }
}

impl Mix {
    fn total(&self) -> u64 {
        u64::from(self.read) + u64::from(self.write) + u64::from(self.erase) + u64::from(self.cache_hit)
    }
}

const TASKS: &[&str] = &["kworker/u2:1", "jffs2_gcd_mtd2", "ubifs_bgt0_0", "sqlite3", "dd"];

pub struct Workload<R> {
    rng: R,
    geometry: FlashGeometry,
    mix: Mix,
}

impl<R: RngCore> Workload<R> {
    pub fn new(rng: R, geometry: FlashGeometry) -> Self {
        Self {
            rng,
            geometry,
            mix: Mix::default(),
        }
    }

    pub fn with_mix(mut self, mix: Mix) -> Self {
        self.mix = mix;
        self
    }

    /// Draw the next operation. An all-zero mix only produces reads.
    pub fn next_op(&mut self) -> FlashOp {
        let page = self.below(self.geometry.page_count());
        let total = self.mix.total();
        if total == 0 {
            return FlashOp::PageRead { page };
        }

        let mut pick = self.below(total);
        for (weight, op) in [
            (self.mix.read, FlashOp::PageRead { page }),
            (self.mix.write, FlashOp::PageWrite { page }),
            (self.mix.erase, FlashOp::BlockErase { block: self.geometry.block_of_page(page) }),
        ] {
            if pick < u64::from(weight) {
                return op;
            }
            pick -= u64::from(weight);
        }
        FlashOp::CacheHit { page }
    }

    /// Name of the task issuing the next operation.
    pub fn next_task(&mut self) -> &'static str {
        TASKS[self.below(TASKS.len() as u64) as usize]
    }

    /// Generate `ops` operations and push each through `sink`: counted
    /// kinds go to both `record_access` and `insert_event`, cache hits only
    /// to the log. Returns how many operations the sink accepted.
    pub fn drive(&mut self, sink: &dyn EventSink, ops: usize) -> usize {
        let mut accepted = 0;
        for _ in 0..ops {
            let op = self.next_op();
            let task = Some(self.next_task());
            let ok = match op {
                FlashOp::PageRead { page } => self.counted(sink, AccessKind::Read, page, task),
                FlashOp::PageWrite { page } => self.counted(sink, AccessKind::Write, page, task),
                FlashOp::BlockErase { block } => {
                    let counted = sink.record_access(AccessKind::Erase, block as u32);
                    sink.insert_event(EventKind::Erase, block, task) && counted
                }
                FlashOp::CacheHit { page } => sink.insert_event(EventKind::CacheHit, page, task),
            };
            if ok {
                accepted += 1;
            }
        }
        accepted
    }

    fn counted(&self, sink: &dyn EventSink, kind: AccessKind, page: u64, task: Option<&str>) -> bool {
        let block = self.geometry.block_of_page(page) as u32;
        let counted = sink.record_access(kind, block);
        sink.insert_event(kind.into(), page, task) && counted
    }

    fn below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        self.rng.next_u64() % bound
    }
}
