use std::sync::Arc;
use std::time::Duration;

use flashmon_monitor::mock::{ManualClock, MockFlash};
use flashmon_monitor::notify::NoProcesses;
use flashmon_monitor::{ControlFlags, EventKind, Monitor, MonitorConfig};

use super::*;

fn line(millis: u64, kind: EventKind, address: u64, task: Option<&str>) -> TraceLine {
    TraceLine {
        timestamp: Duration::from_millis(millis),
        kind,
        address,
        task: task.map(String::from),
    }
}

fn monitor_with_clock(log_task: bool) -> (Monitor, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let config = MonitorConfig {
        log_size: 64,
        log_task,
        ..MonitorConfig::default()
    };
    let monitor = Monitor::new(
        &MockFlash::new(8, 16, 512),
        &config,
        Box::new(clock.clone()),
        Box::new(NoProcesses),
    )
    .unwrap();
    (monitor, clock)
}

// ---- TraceLine parsing ----

#[test]
fn parses_three_field_line() {
    let parsed: TraceLine = "0.100000000;W;200".parse().unwrap();
    assert_eq!(parsed, line(100, EventKind::Write, 200, None));
    assert_eq!(parsed.to_string(), "0.100000000;W;200");
}

#[test]
fn parses_four_field_line() {
    let parsed: TraceLine = "12.000001;E;3;jffs2_gcd_mtd2\n".parse().unwrap();
    assert_eq!(parsed.timestamp, Duration::new(12, 1_000));
    assert_eq!(parsed.kind, EventKind::Erase);
    assert_eq!(parsed.address, 3);
    assert_eq!(parsed.task.as_deref(), Some("jffs2_gcd_mtd2"));
    assert_eq!(parsed.to_string(), "12.000001000;E;3;jffs2_gcd_mtd2");
}

#[test]
fn keeps_empty_task_field() {
    let parsed: TraceLine = "2.000000000;C;8;".parse().unwrap();
    assert_eq!(parsed.task.as_deref(), Some(""));
    assert_eq!(parsed.to_string(), "2.000000000;C;8;");
}

#[test]
fn accepts_whole_seconds() {
    let parsed: TraceLine = "7;R;1".parse().unwrap();
    assert_eq!(parsed.timestamp, Duration::from_secs(7));
}

#[test]
fn rejects_malformed_lines() {
    assert_eq!("1.0;R".parse::<TraceLine>(), Err(TraceError::FieldCount(2)));
    assert_eq!(
        "1.0;R;1;a;b".parse::<TraceLine>(),
        Err(TraceError::FieldCount(5))
    );
    assert_eq!(
        "x;R;1".parse::<TraceLine>(),
        Err(TraceError::Timestamp(String::from("x")))
    );
    assert!(matches!(
        "1.0123456789;R;1".parse::<TraceLine>(),
        Err(TraceError::Timestamp(_))
    ));
    assert!(matches!("-1.0;R;1".parse::<TraceLine>(), Err(TraceError::Timestamp(_))));
    assert_eq!(
        "1.0;Q;1".parse::<TraceLine>(),
        Err(TraceError::Kind(String::from("Q")))
    );
    assert!(matches!("1.0;RW;1".parse::<TraceLine>(), Err(TraceError::Kind(_))));
    assert_eq!(
        "1.0;R;-1".parse::<TraceLine>(),
        Err(TraceError::Address(String::from("-1")))
    );
}

#[test]
fn parse_trace_reports_line_number() {
    let text = "0.1;R;1\n\n0.2;W;2\n0.3;X;3\n";
    let err = parse_trace(text).unwrap_err();
    assert_eq!(err.line, 4);
    assert_eq!(err.source, TraceError::Kind(String::from("X")));

    let ok = parse_trace("0.1;R;1\n\n0.2;W;2\n").unwrap();
    assert_eq!(ok.len(), 2);
}

// ---- start_at_zero ----

#[test]
fn start_at_zero_rebases_on_first_line() {
    let mut lines = vec![
        line(5_250, EventKind::Read, 1, Some("dd")),
        line(5_500, EventKind::Write, 2, Some("dd")),
        line(7_000, EventKind::Erase, 0, Some("gc")),
    ];
    start_at_zero(&mut lines);
    let out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    assert_eq!(
        out,
        vec![
            "0.000000000;R;1;dd",
            "0.250000000;W;2;dd",
            "1.750000000;E;0;gc",
        ]
    );

    let mut empty: Vec<TraceLine> = Vec::new();
    start_at_zero(&mut empty);
    assert!(empty.is_empty());
}

// ---- task_runs ----

#[test]
fn runs_split_on_task_change_and_keep_last() {
    let lines = vec![
        line(500, EventKind::Read, 1, Some("dd")),
        line(750, EventKind::Write, 2, Some("dd")),
        line(1_250, EventKind::Read, 3, Some("dd")),
        line(1_500, EventKind::Erase, 0, Some("gc")),
        line(1_600, EventKind::CacheHit, 4, Some("gc")),
        line(2_000, EventKind::Read, 5, Some("dd")),
    ];
    let runs = task_runs(&lines);
    assert_eq!(runs.len(), 3);

    assert_eq!(runs[0].task, "dd");
    assert_eq!((runs[0].reads, runs[0].writes, runs[0].erases), (2, 1, 0));
    assert_eq!(
        runs[0].to_string(),
        "0.500000 -> 1.250000 (0.750000) : [dd], R/W/E : 2/1/0"
    );

    assert_eq!(runs[1].task, "gc");
    assert_eq!(runs[1].erases, 1);
    assert_eq!(runs[1].reads, 0);
    assert_eq!(runs[1].duration(), Duration::from_millis(100));

    // The final run is reported too.
    assert_eq!(runs[2].task, "dd");
    assert_eq!(runs[2].reads, 1);
    assert_eq!(runs[2].duration(), Duration::ZERO);
}

#[test]
fn runs_group_untasked_events() {
    let lines = vec![
        line(0, EventKind::Read, 1, None),
        line(1, EventKind::Read, 2, None),
    ];
    let runs = task_runs(&lines);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].task, "");
    assert!(task_runs(&[]).is_empty());
}

// ---- Simulator helpers ----

#[test]
fn control_write_parses() {
    let write: ControlWrite = "log:timereset".parse().unwrap();
    assert_eq!(write.endpoint, Endpoint::Log);
    assert_eq!(write.command, "timereset");

    let write: ControlWrite = "flashmon:reset".parse().unwrap();
    assert_eq!(write.endpoint, Endpoint::Counters);

    assert!("disk:reset".parse::<ControlWrite>().is_err());
    assert!("reset".parse::<ControlWrite>().is_err());
}

#[test]
fn control_write_applies_to_monitor() {
    let (monitor, _clock) = monitor_with_clock(false);
    "counters:stop".parse::<ControlWrite>().unwrap().apply(&monitor).unwrap();
    assert!(!monitor.flags().contains(ControlFlags::MONITORING));

    "log:stop".parse::<ControlWrite>().unwrap().apply(&monitor).unwrap();
    assert!(monitor.flags().is_empty());

    assert!("log:bogus".parse::<ControlWrite>().unwrap().apply(&monitor).is_err());
    assert!("counters:timereset".parse::<ControlWrite>().unwrap().apply(&monitor).is_err());
}

#[test]
fn drain_small_chunks_matches_one_read() {
    let (monitor, clock) = monitor_with_clock(true);
    for page in 0..40 {
        clock.advance(Duration::from_micros(125));
        monitor.page_write(page, Some("sqlite3"));
    }
    let file = monitor.log_file().unwrap();

    let mut small = Vec::new();
    let copied = drain(&file, 32, &mut small).unwrap();
    let mut large = Vec::new();
    drain(&file, 1 << 16, &mut large).unwrap();

    assert_eq!(copied, small.len());
    assert_eq!(small, large);
    assert_eq!(String::from_utf8(small).unwrap().lines().count(), 40);
}

#[test]
fn drain_rejects_chunk_smaller_than_a_line() {
    let (monitor, _clock) = monitor_with_clock(false);
    let mut out = Vec::new();
    // Counter lines are "0 0 0\n", six bytes each.
    assert!(drain(&monitor.counter_file(), 5, &mut out).is_err());
    assert_eq!(drain(&monitor.counter_file(), 6, &mut out).unwrap(), 8 * 6);

    // Nothing logged yet: a tiny buffer is fine.
    let file = monitor.log_file().unwrap();
    assert_eq!(drain(&file, 4, &mut out).unwrap(), 0);
    monitor.page_read(1, None);
    assert!(drain(&file, 4, &mut out).is_err());
}

// ---- Monitor output through the tools ----

#[test]
fn exported_log_round_trips_through_tools() {
    let (monitor, clock) = monitor_with_clock(true);
    clock.set(Duration::from_secs(3));
    monitor.page_read(17, Some("cat"));
    clock.advance(Duration::from_millis(20));
    monitor.page_read(18, Some("cat"));
    clock.advance(Duration::from_millis(30));
    monitor.block_erase(2, Some("ubifs_bgt0_0"));

    let mut exported = Vec::new();
    drain(&monitor.log_file().unwrap(), 4096, &mut exported).unwrap();
    let text = String::from_utf8(exported).unwrap();
    assert_eq!(
        text,
        "3.000000000;R;17;cat\n3.020000000;R;18;cat\n3.050000000;E;2;ubifs_bgt0_0\n"
    );

    let mut lines = parse_trace(&text).unwrap();
    start_at_zero(&mut lines);
    assert_eq!(lines[2].to_string(), "0.050000000;E;2;ubifs_bgt0_0");

    let runs = task_runs(&lines);
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].to_string(), "0.000000 -> 0.020000 (0.020000) : [cat], R/W/E : 2/0/0");
    assert_eq!(runs[1].to_string(), "0.050000 -> 0.050000 (0.000000) : [ubifs_bgt0_0], R/W/E : 0/0/1");
}
