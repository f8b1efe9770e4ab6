use std::io::{self, BufWriter, Write};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use flashmon_monitor::host::HostClock;
use flashmon_monitor::mock::MockFlash;
use flashmon_monitor::{Monitor, MonitorConfig, ProcessTable, Workload};
use flashmon_tools::{drain, ControlWrite};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Dump {
    Counters,
    Log,
    Both,
    Off,
}

/// Run a synthetic flash workload through a monitor and print what a
/// consumer of flashmon and flashmon_log would read.
#[derive(Parser, Debug)]
#[command(name = "flashmon-sim", version, about)]
struct Cli {
    /// Blocks on the simulated device.
    #[arg(long, default_value_t = 256)]
    blocks: u32,

    #[arg(long, default_value_t = 64)]
    pages_per_block: u32,

    /// Page size in bytes.
    #[arg(long, default_value_t = 2048)]
    page_size: u32,

    /// Add a partition as FIRST_BLOCK:BLOCKS (repeatable, indexed in order).
    #[arg(long, value_parser = parse_partition)]
    partition: Vec<(u32, u32)>,

    /// Monitor parameters, e.g. "log_size=4096 traced_part=0 log_task=1".
    #[arg(long, default_value = "")]
    params: String,

    /// Operations to generate.
    #[arg(long, default_value_t = 10_000)]
    ops: usize,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Control writes applied after the workload, e.g. "log:stop".
    #[arg(long = "control")]
    controls: Vec<ControlWrite>,

    /// Read buffer size used to page the files out.
    #[arg(long, default_value_t = 4096)]
    chunk: usize,

    #[arg(long, value_enum, default_value_t = Dump::Both)]
    dump: Dump,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn parse_partition(s: &str) -> Result<(u32, u32), String> {
    let (first, count) = s
        .split_once(':')
        .ok_or_else(|| format!("expected FIRST_BLOCK:BLOCKS, got {:?}", s))?;
    let num = |v: &str| v.parse::<u32>().map_err(|e| format!("{:?}: {}", v, e));
    Ok((num(first)?, num(count)?))
}

#[cfg(unix)]
fn process_table() -> Box<dyn ProcessTable> {
    Box::new(flashmon_monitor::host::SignalProcessTable)
}

#[cfg(not(unix))]
fn process_table() -> Box<dyn ProcessTable> {
    Box::new(flashmon_monitor::notify::NoProcesses)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    flashmon_tools::init_tracing(cli.verbose);

    let config = MonitorConfig::parse_params(&cli.params).context("parsing --params")?;
    let mut device = MockFlash::new(cli.blocks, cli.pages_per_block, cli.page_size);
    for &(first, count) in &cli.partition {
        device = device.with_partition(first, count);
    }

    let monitor = Monitor::new(&device, &config, Box::new(HostClock::new()), process_table())
        .context("starting monitor")?;

    let mut workload = Workload::new(SmallRng::seed_from_u64(cli.seed), *monitor.geometry());
    let accepted = workload.drive(&monitor, cli.ops);
    tracing::info!(ops = cli.ops, accepted, "workload done");

    for control in &cli.controls {
        control.apply(&monitor)?;
    }

    let mut out = BufWriter::new(io::stdout().lock());
    if matches!(cli.dump, Dump::Counters | Dump::Both) {
        let file = monitor.counter_file();
        writeln!(out, "# flashmon")?;
        drain(&file, cli.chunk, &mut out)?;
    }
    if matches!(cli.dump, Dump::Log | Dump::Both) {
        match monitor.log_file() {
            Some(file) => {
                writeln!(out, "# flashmon_log")?;
                drain(&file, cli.chunk, &mut out)?;
            }
            None => tracing::warn!("event log disabled, nothing to dump"),
        }
    }
    out.flush()?;
    drop(out);

    monitor.shutdown();
    Ok(())
}
