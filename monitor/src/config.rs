/// Monitor parameters.
///
/// Set once at start-up, the way module parameters are passed at load
/// time. `parse_params` accepts the same settings as a whitespace-separated
/// `key=value` list, e.g. `"observer_pid=812 log_size=4096 traced_part=2"`.
use alloc::string::{String, ToString};

use crate::error::ConfigError;
use crate::notify::Pid;

/// Default number of retained log events.
pub const DEFAULT_LOG_SIZE: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Process to signal on every accepted event; 0 for none.
    pub observer_pid: Pid,
    /// Events retained by the log; 0 disables the log entirely.
    pub log_size: usize,
    /// Partition index to trace; None traces the whole device.
    pub traced_partition: Option<usize>,
    /// Record the task name with every logged event.
    pub log_task: bool,
    /// Log reads served from the driver's page buffer.
    pub log_cache_hits: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            observer_pid: 0,
            log_size: DEFAULT_LOG_SIZE,
            traced_partition: None,
            log_task: true,
            log_cache_hits: true,
        }
    }
}

impl MonitorConfig {
    /// Apply `key=value` pairs on top of the defaults.
    ///
    /// Keys: `observer_pid`, `log_size`, `traced_part` (`-1` for all),
    /// `log_task`, `log_cache_hits` (`0`/`1`, `true`/`false`).
    pub fn parse_params(params: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for param in params.split_whitespace() {
            let (key, value) = param
                .split_once('=')
                .ok_or_else(|| ConfigError::MissingValue(param.to_string()))?;
            if value.is_empty() {
                return Err(ConfigError::MissingValue(key.to_string()));
            }

            match key {
                "observer_pid" => config.observer_pid = parse_num(key, value)?,
                "log_size" => config.log_size = parse_num(key, value)?,
                "traced_part" => {
                    config.traced_partition = match value {
                        "-1" => None,
                        v => Some(parse_num(key, v)?),
                    }
                }
                "log_task" => config.log_task = parse_bool(key, value)?,
                "log_cache_hits" => config.log_cache_hits = parse_bool(key, value)?,
                _ => return Err(ConfigError::UnknownKey(key.to_string())),
            }
        }
        Ok(config)
    }
}

fn parse_num<T: core::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: String::from(key),
        value: String::from(value),
    }
}
