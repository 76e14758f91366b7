//! sealbench - seal verifier benchmark driver
//!
//! Runs the benchmark plan against the seal verifier and prints one
//! comparison table per SMR scheme.
//!
//! ## Usage
//!
//! - `sealbench`: run the built-in plan with the default timeout
//! - `sealbench 120`: limit every verifier call to 120 seconds
//! - `sealbench --config plan.toml`: run a custom plan

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, Level};

use sealbench_core::{init_tracing, HarnessConfig, RunDriver, RunOutcome};

#[derive(Parser, Debug)]
#[command(name = "sealbench")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Benchmark the seal SMR verifier", long_about = None)]
struct Cli {
    /// Per-invocation timeout in seconds (overrides the plan)
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// TOML benchmark plan (default: built-in HP and EBR plan)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verifier executable (default: ./seal)
    #[arg(long)]
    verifier: Option<String>,

    /// Root directory of the benchmark programs and specs
    #[arg(long)]
    examples_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Load the plan and apply command-line overrides.
    fn harness_config(&self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)
                .with_context(|| format!("Failed to load plan {}", path.display()))?,
            None => HarnessConfig::default(),
        };

        if let Some(secs) = self.timeout {
            config.timeout_secs = secs;
        }
        if let Some(verifier) = &self.verifier {
            config.verifier = vec![verifier.clone()];
        }
        if let Some(dir) = &self.examples_dir {
            config.examples_root = dir.clone();
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let config = cli.harness_config()?;
    info!(
        timeout_secs = config.timeout_secs,
        sections = config.sections.len(),
        "Starting benchmark run"
    );
    let driver = RunDriver::new(config).context("Invalid benchmark plan")?;

    // Registered before the first verifier starts, so a Ctrl-C aimed at the
    // terminal never takes the default action.
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to watch SIGINT")?;
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to watch SIGTERM")?;
    let interrupt = async move {
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let outcome = driver
        .run(&mut out, interrupt)
        .await
        .context("Benchmark run failed")?;

    if outcome == RunOutcome::Interrupted {
        writeln!(out, "Interrupted.")?;
        out.flush()?;
    }
    Ok(())
}
