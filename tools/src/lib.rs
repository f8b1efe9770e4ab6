//! Host-side tooling for flashmon.
//!
//! Parses event logs exported from `flashmon_log`, rebases them to start at
//! zero, summarizes them per task, and drives a simulated monitor for
//! trying the control protocol without hardware.

pub mod analyze;
pub mod sim;
pub mod trace;

pub use analyze::{task_runs, TaskRun};
pub use sim::{drain, ControlWrite, Endpoint};
pub use trace::{parse_trace, start_at_zero, LineError, TraceError, TraceLine};

use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber used by every binary. `RUST_LOG`
/// overrides the default level.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .init();
}

#[cfg(test)]
mod tests;
