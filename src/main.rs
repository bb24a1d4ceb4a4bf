//! scorebin: credit-risk scorecard CLI
//!
//! Fits monotonic optimal binning and WoE scorecards on CSV/Parquet files and
//! monitors population stability against a fitted artifact.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use scorebin::cli::{self, Cli};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scorebin=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli::run(&cli)
}
