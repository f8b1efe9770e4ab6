//! Benchmark: producer-path cost and log paging.
//!
//! The producer numbers bound the overhead added to every observed flash
//! operation; the paging numbers show what a consumer pays per chunk.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use flashmon_monitor::mock::{ManualClock, MockFlash};
use flashmon_monitor::notify::NoProcesses;
use flashmon_monitor::{AccessKind, EventKind, EventSink, Monitor, MonitorConfig, ProcFile};

fn monitor(log_size: usize, log_task: bool) -> Monitor {
    let config = MonitorConfig {
        log_size,
        log_task,
        ..MonitorConfig::default()
    };
    Monitor::new(
        &MockFlash::new(2048, 64, 2048),
        &config,
        Box::new(Arc::new(ManualClock::new())),
        Box::new(NoProcesses),
    )
    .unwrap()
}

fn bench_producer(c: &mut Criterion) {
    let mut group = c.benchmark_group("producer");

    let m = monitor(4096, false);
    group.bench_function("record_access", |b| {
        let mut block = 0u32;
        b.iter(|| {
            block = (block + 1) % 2048;
            black_box(m.record_access(AccessKind::Read, black_box(block)))
        });
    });

    group.bench_function("insert_event", |b| {
        let mut page = 0u64;
        b.iter(|| {
            page = (page + 1) % 131_072;
            black_box(m.insert_event(EventKind::Write, black_box(page), None))
        });
    });

    let tasked = monitor(4096, true);
    group.bench_function("page_read_with_task", |b| {
        let mut page = 0u64;
        b.iter(|| {
            page = (page + 1) % 131_072;
            black_box(tasked.page_read(black_box(page), Some("kworker/u2:1")))
        });
    });

    group.finish();
}

fn bench_paging(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_paging");
    let m = monitor(4096, true);
    for page in 0..4096u64 {
        m.page_write(page, Some("sqlite3"));
    }
    let file = m.log_file().unwrap();

    for chunk in [256usize, 4096, 65_536] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            let mut buf = vec![0u8; chunk];
            b.iter(|| {
                let mut pos = 0;
                loop {
                    let r = file.read(pos, &mut buf);
                    if r.written == 0 {
                        break;
                    }
                    pos = r.next;
                }
                black_box(pos)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_producer, bench_paging);
criterion_main!(benches);
