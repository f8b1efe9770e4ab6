/// Helpers for the simulator: control-write arguments and paging a file
/// out with a fixed buffer, the way a consumer process would.
use std::io::Write;
use std::str::FromStr;

use anyhow::{bail, Context};
use flashmon_monitor::{Monitor, ProcFile, ReadStatus};

/// Which monitor file a control write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `flashmon`
    Counters,
    /// `flashmon_log`
    Log,
}

/// `<counters|log>:<command>`, e.g. `log:timereset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlWrite {
    pub endpoint: Endpoint,
    pub command: String,
}

impl FromStr for ControlWrite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (endpoint, command) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <counters|log>:<command>, got {:?}", s))?;
        let endpoint = match endpoint {
            "counters" | "flashmon" => Endpoint::Counters,
            "log" | "flashmon_log" => Endpoint::Log,
            other => return Err(format!("unknown file {:?}", other)),
        };
        Ok(Self {
            endpoint,
            command: command.to_string(),
        })
    }
}

impl ControlWrite {
    /// Write the command to its file on `monitor`.
    pub fn apply(&self, monitor: &Monitor) -> anyhow::Result<()> {
        let result = match self.endpoint {
            Endpoint::Counters => monitor.counter_file().write(self.command.as_bytes()),
            Endpoint::Log => match monitor.log_file() {
                Some(file) => file.write(self.command.as_bytes()),
                None => bail!("event log is disabled"),
            },
        };
        result.with_context(|| format!("writing {:?} to {:?}", self.command, self.endpoint))?;
        Ok(())
    }
}

/// Page `file` into `out` through a `chunk`-byte buffer until it runs dry.
/// Returns the bytes copied.
pub fn drain(file: &dyn ProcFile, chunk: usize, out: &mut dyn Write) -> anyhow::Result<usize> {
    let mut buf = vec![0u8; chunk];
    let mut pos = 0;
    let mut total = 0;
    loop {
        let r = file.read(pos, &mut buf);
        if r.status == ReadStatus::BufferTooSmall {
            bail!("{}: a {}-byte buffer cannot hold one line", file.name(), chunk);
        }
        if r.written == 0 {
            return Ok(total);
        }
        out.write_all(&buf[..r.written])?;
        total += r.written;
        pos = r.next;
    }
}
