//! CLI module - argument parsing and command runners

mod args;
pub mod fit;
pub mod psi;
pub mod score;
pub mod transform;

pub use args::{Cli, Commands, FitArgs, PsiArgs, ScoreArgs, TransformArgs};

use anyhow::Result;

/// Dispatch a parsed command line to its runner
pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Fit(args) => fit::run_fit(args, cli.quiet),
        Commands::Transform(args) => transform::run_transform(args, cli.quiet),
        Commands::Score(args) => score::run_score(args, cli.quiet),
        Commands::Psi(args) => psi::run_psi(args, cli.quiet),
    }
}
