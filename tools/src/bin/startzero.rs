use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use flashmon_tools::{parse_trace, start_at_zero};

/// Rebase an exported flashmon event log so the first event is at 0 s.
#[derive(Parser, Debug)]
#[command(name = "flashmon-startzero", version, about)]
struct Cli {
    /// Log saved from flashmon_log.
    log: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    flashmon_tools::init_tracing(false);

    let text = std::fs::read_to_string(&cli.log)
        .with_context(|| format!("reading {}", cli.log.display()))?;
    let mut lines = parse_trace(&text).with_context(|| format!("parsing {}", cli.log.display()))?;
    start_at_zero(&mut lines);

    let mut out = BufWriter::new(io::stdout().lock());
    for line in &lines {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;
    Ok(())
}
