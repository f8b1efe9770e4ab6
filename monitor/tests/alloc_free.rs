/// The producer path must not touch the heap.
///
/// A counting global allocator tallies allocations made while the current
/// thread has tracking switched on; everything else passes straight through
/// to the system allocator.
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flashmon_monitor::mock::{ManualClock, MockFlash, MockProcessTable};
use flashmon_monitor::{AccessKind, EventKind, EventSink, Monitor, MonitorConfig, ProcFile};

struct Counting;

static TRACKED_ALLOCS: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static TRACKING: Cell<bool> = const { Cell::new(false) };
}

fn tracking() -> bool {
    TRACKING.try_with(Cell::get).unwrap_or(false)
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if tracking() {
            TRACKED_ALLOCS.fetch_add(1, Ordering::Relaxed);
        }
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if tracking() {
            TRACKED_ALLOCS.fetch_add(1, Ordering::Relaxed);
        }
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static ALLOCATOR: Counting = Counting;

/// Allocations made by `f` on this thread.
fn allocations_in(f: impl FnOnce()) -> usize {
    let before = TRACKED_ALLOCS.load(Ordering::Relaxed);
    TRACKING.with(|t| t.set(true));
    f();
    TRACKING.with(|t| t.set(false));
    TRACKED_ALLOCS.load(Ordering::Relaxed) - before
}

#[test]
fn producer_path_does_not_allocate() {
    let clock = Arc::new(ManualClock::new());
    let processes = Arc::new(MockProcessTable::new(&[812]));
    let config = MonitorConfig {
        observer_pid: 812,
        log_size: 64,
        log_task: true,
        ..MonitorConfig::default()
    };
    let monitor = Monitor::new(
        &MockFlash::new(16, 64, 2048),
        &config,
        Box::new(clock.clone()),
        Box::new(processes.clone()),
    )
    .unwrap();

    // Every page and block below stays in range, so no diagnostics fire.
    let run = |iterations: u64| {
        for i in 0..iterations {
            clock.advance(std::time::Duration::from_nanos(10));
            let page = i % 1000;
            monitor.page_read(page, Some("a_task_name_longer_than_fifteen"));
            monitor.page_write(page, Some("dd"));
            monitor.cache_hit(page, None);
            monitor.block_erase(i % 16, Some("gc"));
            monitor.read_range(page * 2048, 3 * 2048, Some(page + 1), Some("cat"));
            monitor.insert_event(EventKind::Read, page, Some("raw"));
            monitor.record_access(AccessKind::Write, (i % 16) as u32);
        }
    };
    run(1);
    let allocs = allocations_in(|| run(10_000));
    assert_eq!(allocs, 0);
    assert_eq!(processes.alarms(), 7 * 10_001);
}

#[test]
fn paging_into_fixed_buffer_does_not_allocate() {
    let clock = Arc::new(ManualClock::new());
    let monitor = Monitor::new(
        &MockFlash::new(16, 64, 2048),
        &MonitorConfig::default(),
        Box::new(clock.clone()),
        Box::new(flashmon_monitor::notify::NoProcesses),
    )
    .unwrap();
    for page in 0..2000 {
        clock.advance(std::time::Duration::from_micros(3));
        monitor.page_read(page % 1024, Some("reader"));
    }

    let mut buf = [0u8; 256];
    let log_file = monitor.log_file().unwrap();
    let counter_file = monitor.counter_file();
    let mut lines = 0;
    let allocs = allocations_in(|| {
        let mut pos = 0;
        loop {
            let r = log_file.read(pos, &mut buf);
            if r.written == 0 {
                break;
            }
            lines += buf[..r.written].iter().filter(|&&b| b == b'\n').count();
            pos = r.next;
        }
        let mut pos = 0;
        loop {
            let r = counter_file.read(pos, &mut buf);
            if r.written == 0 {
                break;
            }
            pos = r.next;
        }
    });
    assert_eq!(allocs, 0);
    assert_eq!(lines, 1024);
}
