/// Enable flags and control command parsing.
///
/// The monitor has two independent switches: `MONITORING` gates every
/// producer call (counters, log and notifications), `LOGGING` gates the
/// event log only. Both live in one atomic byte so the producer path checks
/// them without taking a lock.
use alloc::string::String;
use core::sync::atomic::{AtomicU8, Ordering};

use bitflags::bitflags;

use crate::error::CommandError;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlFlags: u8 {
        /// Producer calls reach counters, log and notifier.
        const MONITORING = 1 << 0;
        /// Accepted events are appended to the event log.
        const LOGGING = 1 << 1;
    }
}

pub struct ControlState {
    bits: AtomicU8,
}

impl ControlState {
    pub const fn new(initial: ControlFlags) -> Self {
        Self {
            bits: AtomicU8::new(initial.bits()),
        }
    }

    pub fn flags(&self) -> ControlFlags {
        ControlFlags::from_bits_truncate(self.bits.load(Ordering::Acquire))
    }

    pub fn is_enabled(&self, flag: ControlFlags) -> bool {
        self.flags().contains(flag)
    }

    pub fn enable(&self, flag: ControlFlags) {
        self.bits.fetch_or(flag.bits(), Ordering::AcqRel);
    }

    pub fn disable(&self, flag: ControlFlags) {
        self.bits.fetch_and(!flag.bits(), Ordering::AcqRel);
    }
}

/// Longest accepted control write, in bytes.
pub const MAX_COMMAND_LEN: usize = 32;

static_assertions::const_assert!(MAX_COMMAND_LEN >= "timereset\n".len());

/// A control command written to one of the monitor files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Clear the file's component; flags untouched.
    Reset,
    /// Turn the file's flag on.
    Start,
    /// Turn the file's flag off.
    Stop,
    /// Clear the event log and rebase its zero instant (log file only).
    TimeReset,
}

impl Command {
    /// Parse a raw control write.
    ///
    /// The input is length-checked and copied into a fixed buffer before
    /// anything looks at its contents. Surrounding whitespace and NUL
    /// padding are ignored, so `echo reset > file` works.
    pub fn parse(input: &[u8]) -> Result<Self, CommandError> {
        if input.len() > MAX_COMMAND_LEN {
            return Err(CommandError::TooLong {
                len: input.len(),
                max: MAX_COMMAND_LEN,
            });
        }
        let mut received = [0u8; MAX_COMMAND_LEN];
        received[..input.len()].copy_from_slice(input);
        let text = trim(&received[..input.len()]);

        match text {
            b"reset" => Ok(Command::Reset),
            b"start" => Ok(Command::Start),
            b"stop" => Ok(Command::Stop),
            b"timereset" => Ok(Command::TimeReset),
            other => Err(CommandError::Unrecognized(String::from_utf8_lossy(other).into_owned())),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Command::Reset => "reset",
            Command::Start => "start",
            Command::Stop => "stop",
            Command::TimeReset => "timereset",
        }
    }
}

fn trim(bytes: &[u8]) -> &[u8] {
    let is_pad = |b: &u8| b.is_ascii_whitespace() || *b == 0;
    let start = bytes.iter().position(|b| !is_pad(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_pad(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}
