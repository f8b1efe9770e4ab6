/// Exported log lines.
///
/// A line is `<sec>.<frac>;<R|W|E|C>;<address>` with an optional fourth
/// `;<task>` field. The fraction may carry 1 to 9 digits, so logs that went
/// through other tools with fewer decimals still parse.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use flashmon_monitor::EventKind;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("expected 3 or 4 fields, found {0}")]
    FieldCount(usize),

    #[error("bad timestamp {0:?}")]
    Timestamp(String),

    #[error("unknown event kind {0:?}")]
    Kind(String),

    #[error("bad address {0:?}")]
    Address(String),
}

/// A `TraceError` located in a file.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {source}")]
pub struct LineError {
    pub line: usize,
    pub source: TraceError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    pub timestamp: Duration,
    pub kind: EventKind,
    pub address: u64,
    /// Present (possibly empty) when the log was captured with task names.
    pub task: Option<String>,
}

impl FromStr for TraceLine {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim_end_matches(['\r', '\n']).split(';').collect();
        let (time, kind, address, task) = match fields.as_slice() {
            [time, kind, address] => (*time, *kind, *address, None),
            [time, kind, address, task] => (*time, *kind, *address, Some(task.to_string())),
            other => return Err(TraceError::FieldCount(other.len())),
        };

        let mut code = kind.chars();
        let kind = match (code.next(), code.next()) {
            (Some(c), None) => EventKind::from_code(c),
            _ => None,
        }
        .ok_or_else(|| TraceError::Kind(kind.to_string()))?;

        Ok(Self {
            timestamp: parse_timestamp(time)?,
            kind,
            address: address
                .parse()
                .map_err(|_| TraceError::Address(address.to_string()))?,
            task,
        })
    }
}

/// Same format the monitor emits, without the trailing newline.
impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:09};{};{}",
            self.timestamp.as_secs(),
            self.timestamp.subsec_nanos(),
            self.kind.code(),
            self.address
        )?;
        if let Some(task) = &self.task {
            write!(f, ";{}", task)?;
        }
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> Result<Duration, TraceError> {
    let bad = || TraceError::Timestamp(s.to_string());
    let (secs, frac) = s.split_once('.').unwrap_or((s, ""));
    if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }

    let secs: u64 = secs.parse().map_err(|_| bad())?;
    let nanos = if frac.is_empty() {
        0
    } else {
        let digits: u32 = frac.parse().map_err(|_| bad())?;
        digits * 10u32.pow(9 - frac.len() as u32)
    };
    Ok(Duration::new(secs, nanos))
}

/// Parse a whole exported log. Blank lines are skipped; the first bad line
/// aborts with its 1-based line number.
pub fn parse_trace(text: &str) -> Result<Vec<TraceLine>, LineError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            line.parse::<TraceLine>()
                .map_err(|source| LineError { line: i + 1, source })
        })
        .collect()
}

/// Shift every timestamp so the first line sits at zero.
pub fn start_at_zero(lines: &mut [TraceLine]) {
    let Some(offset) = lines.first().map(|l| l.timestamp) else {
        return;
    };
    for line in lines {
        line.timestamp = line.timestamp.saturating_sub(offset);
    }
}
