/// Control files: the chunked text protocol a consumer talks to.
///
/// Two files, modelled on the classic `/proc` pair:
///
/// - `flashmon`: one `"<reads> <writes> <erases>\n"` line per block. The
///   read position is a block number. Writes accept `reset`, `start`,
///   `stop` and act on the counters and the `MONITORING` flag.
/// - `flashmon_log`: one `"<sec>.<nsec>;<R|W|E|C>;<address>[;<task>]\n"`
///   line per retained event. The read position counts events from the
///   oldest retained one. Writes accept `reset`, `start`, `stop` and
///   `timereset` and act on the log and the `LOGGING` flag.
///
/// The consumer owns the read position. Each read fills the caller's buffer
/// with whole lines only and returns where to continue; the monitor keeps
/// no per-reader state.
use core::fmt::{self, Write};
use core::time::Duration;

use crate::control::{Command, ControlFlags};
use crate::counters::BlockCount;
use crate::error::CommandError;
use crate::event::EventRecord;
use crate::monitor::Monitor;
use crate::ring::EventLog;
use crate::task::MAX_TASK_NAME_LEN;

/// Size of the scratch buffer one line is formatted into.
pub const MAX_LINE_LEN: usize = 128;

// u64 seconds, '.', 9 digits, ';', code, ';', u64 address, ';', task, '\n'
const LONGEST_EVENT_LINE: usize = 20 + 1 + 9 + 1 + 1 + 1 + 20 + 1 + MAX_TASK_NAME_LEN + 1;
// three u32 counters, two spaces, '\n'
const LONGEST_COUNTER_LINE: usize = 3 * 10 + 2 + 1;

static_assertions::const_assert!(LONGEST_EVENT_LINE <= MAX_LINE_LEN);
static_assertions::const_assert!(LONGEST_COUNTER_LINE <= MAX_LINE_LEN);

/// Why a read stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The buffer filled up; more lines are waiting at `next`.
    More,
    /// Nothing past `next` right now.
    Exhausted,
    /// Data is waiting, but not even one line fits in the buffer.
    BufferTooSmall,
}

/// Result of one read call.
///
/// `written` is what a byte-oriented reader sees; a short or zero count
/// alone cannot tell "no data" from "buffer too small", `status` can.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    pub written: usize,
    /// Read position for the next call. Unchanged when nothing was written.
    pub next: u64,
    pub status: ReadStatus,
}

/// A file the consumer reads in chunks and writes commands to.
pub trait ProcFile {
    fn name(&self) -> &'static str;

    /// Fill `buf` with whole lines starting at read position `pos`.
    fn read(&self, pos: u64, buf: &mut [u8]) -> ReadOutcome;

    /// Apply a control write. Rejected input changes nothing.
    fn write(&self, input: &[u8]) -> Result<Command, CommandError>;
}

/// `flashmon`: per-block counters and the monitoring switch.
pub struct CounterFile<'a> {
    monitor: &'a Monitor,
}

impl<'a> CounterFile<'a> {
    pub(crate) fn new(monitor: &'a Monitor) -> Self {
        Self { monitor }
    }
}

impl ProcFile for CounterFile<'_> {
    fn name(&self) -> &'static str {
        "flashmon"
    }

    fn read(&self, pos: u64, buf: &mut [u8]) -> ReadOutcome {
        self.monitor
            .counters()
            .read_page(pos, buf, self.monitor.counter_range())
    }

    fn write(&self, input: &[u8]) -> Result<Command, CommandError> {
        let command = parse_or_warn(self.name(), input)?;
        let control = self.monitor.control();
        match command {
            Command::Reset => self.monitor.counters().reset(),
            Command::Start => control.enable(ControlFlags::MONITORING),
            Command::Stop => control.disable(ControlFlags::MONITORING),
            Command::TimeReset => {
                let err = CommandError::Unsupported {
                    command: command.as_str(),
                    file: self.name(),
                };
                tracing::warn!(error = %err, "ignoring control write");
                return Err(err);
            }
        }
        tracing::debug!(file = self.name(), command = command.as_str(), "control");
        Ok(command)
    }
}

/// `flashmon_log`: the event log and the logging switch.
pub struct LogFile<'a> {
    monitor: &'a Monitor,
    log: &'a EventLog,
}

impl<'a> LogFile<'a> {
    pub(crate) fn new(monitor: &'a Monitor, log: &'a EventLog) -> Self {
        Self { monitor, log }
    }
}

impl ProcFile for LogFile<'_> {
    fn name(&self) -> &'static str {
        "flashmon_log"
    }

    fn read(&self, pos: u64, buf: &mut [u8]) -> ReadOutcome {
        self.log.read_session(pos, buf)
    }

    fn write(&self, input: &[u8]) -> Result<Command, CommandError> {
        let command = parse_or_warn(self.name(), input)?;
        let control = self.monitor.control();
        match command {
            Command::Reset => self.log.reset(),
            Command::TimeReset => self.log.rebase(self.monitor.clock().now()),
            Command::Start => control.enable(ControlFlags::LOGGING),
            Command::Stop => control.disable(ControlFlags::LOGGING),
        }
        tracing::debug!(file = self.name(), command = command.as_str(), "control");
        Ok(command)
    }
}

fn parse_or_warn(file: &'static str, input: &[u8]) -> Result<Command, CommandError> {
    Command::parse(input).inspect_err(|err| {
        tracing::warn!(file, error = %err, "ignoring control write");
    })
}

// ---- Line formatting ----

/// One formatted line on the stack.
pub(crate) struct LineBuf {
    bytes: [u8; MAX_LINE_LEN],
    len: usize,
}

impl LineBuf {
    fn new() -> Self {
        Self {
            bytes: [0u8; MAX_LINE_LEN],
            len: 0,
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl Write for LineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > MAX_LINE_LEN {
            return Err(fmt::Error);
        }
        self.bytes[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

// Both formatters stay within MAX_LINE_LEN (asserted above), so the write!
// results are ignored.

pub(crate) fn counter_line(count: BlockCount) -> LineBuf {
    let mut line = LineBuf::new();
    let _ = writeln!(line, "{} {} {}", count.reads, count.writes, count.erases);
    line
}

pub(crate) fn event_line(record: &EventRecord, since_zero: Duration, with_task: bool) -> LineBuf {
    let mut line = LineBuf::new();
    let _ = write!(
        line,
        "{}.{:09};{};{}",
        since_zero.as_secs(),
        since_zero.subsec_nanos(),
        record.kind.code(),
        record.address
    );
    if with_task {
        let task = record.task.as_ref().map_or("", |t| t.as_str());
        let _ = write!(line, ";{}", task);
    }
    let _ = line.write_char('\n');
    line
}

/// Copies whole lines into a caller buffer.
pub(crate) struct PageWriter<'a> {
    buf: &'a mut [u8],
    written: usize,
}

impl<'a> PageWriter<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, written: 0 }
    }

    /// Append `line` if it fits entirely.
    pub(crate) fn push(&mut self, line: &[u8]) -> bool {
        let end = self.written + line.len();
        if end > self.buf.len() {
            return false;
        }
        self.buf[self.written..end].copy_from_slice(line);
        self.written = end;
        true
    }

    /// Close the page. `cursor` is where the read began, `next` where the
    /// following one should begin, `exhausted` whether the data ran out
    /// (as opposed to the buffer).
    pub(crate) fn finish(self, cursor: u64, next: u64, exhausted: bool) -> ReadOutcome {
        let status = match (exhausted, self.written) {
            (true, _) => ReadStatus::Exhausted,
            (false, 0) => ReadStatus::BufferTooSmall,
            (false, _) => ReadStatus::More,
        };
        ReadOutcome {
            written: self.written,
            next: if self.written == 0 { cursor } else { next },
            status,
        }
    }
}
