use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use flashmon_tools::analyze::HEADER;
use flashmon_tools::{parse_trace, task_runs};

/// Summarize an exported flashmon event log by task.
///
/// Consecutive events issued by the same task are grouped into one run;
/// each run prints its time span and page read / page write / block erase
/// counts. The log must have been captured with task names.
#[derive(Parser, Debug)]
#[command(name = "flashmon-analyze", version, about)]
struct Cli {
    /// Log saved from flashmon_log.
    log: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    flashmon_tools::init_tracing(cli.verbose);

    let text = std::fs::read_to_string(&cli.log)
        .with_context(|| format!("reading {}", cli.log.display()))?;
    let lines = parse_trace(&text).with_context(|| format!("parsing {}", cli.log.display()))?;
    if lines.iter().any(|l| l.task.is_none()) {
        tracing::warn!("log has events without task names, grouping them under []");
    }

    let runs = task_runs(&lines);
    tracing::debug!(events = lines.len(), runs = runs.len(), "analyzed");

    let mut out = BufWriter::new(io::stdout().lock());
    writeln!(out, "{}", HEADER)?;
    for run in &runs {
        writeln!(out, "{}", run)?;
    }
    out.flush()?;
    Ok(())
}
