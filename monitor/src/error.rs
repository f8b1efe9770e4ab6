/// Error types for start-up, configuration and control input.
///
/// The producer path has no error type: nothing it observes may
/// fail because of the monitor. It reports through diagnostics instead.
use alloc::string::String;

use thiserror::Error;

/// Fatal start-up errors. A monitor that fails with one of these was never
/// built, so nothing is left half-running.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitError {
    /// The device geometry is unusable.
    #[error("invalid flash geometry: {reason}")]
    Geometry { reason: &'static str },

    /// An event log was requested with room for no events.
    #[error("event log size must be at least 1")]
    EmptyLog,

    /// Backing storage could not be allocated.
    #[error("out of memory allocating {what} ({count} entries)")]
    OutOfMemory { what: &'static str, count: usize },
}

/// Errors parsing monitor parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown parameter: {0}")]
    UnknownKey(String),

    #[error("missing value for parameter {0}")]
    MissingValue(String),

    #[error("invalid value {value:?} for parameter {key}")]
    InvalidValue { key: String, value: String },
}

/// Rejected control writes. State is never touched when one is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("command too long: {len} bytes (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("unrecognized command: {0:?}")]
    Unrecognized(String),

    #[error("{command} is not accepted by {file}")]
    Unsupported {
        command: &'static str,
        file: &'static str,
    },
}
