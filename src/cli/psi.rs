//! `scorebin psi`: stability of binned features (and scores) between two files

use anyhow::{Context, Result};

use super::args::PsiArgs;
use crate::pipeline::loader::{psi_rows_to_frame, read_frame, save_dataset, scoring_dataset};
use crate::pipeline::{
    compute_psi_for, compute_score_psi, psi_table, BinningProcess, PsiLevel, Scorecard,
};
use crate::report::{print_psi_summary, write_json_report, PsiReport, RunMetadata};
use crate::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_run_card, print_success,
};

/// The fitted artifact PSI is computed against
enum Artifact {
    Binning(BinningProcess),
    Scorecard(Box<Scorecard>),
}

impl Artifact {
    fn load(args: &PsiArgs) -> Result<Self> {
        if let Some(path) = &args.scorecard {
            let scorecard = Scorecard::load(path)
                .with_context(|| format!("Failed to load scorecard {}", path.display()))?;
            return Ok(Artifact::Scorecard(Box::new(scorecard)));
        }
        let path = args
            .binning
            .as_ref()
            .context("Either --binning or --scorecard is required")?;
        let process = BinningProcess::load(path)
            .with_context(|| format!("Failed to load binning artifact {}", path.display()))?;
        Ok(Artifact::Binning(process))
    }

    fn process(&self) -> &BinningProcess {
        match self {
            Artifact::Binning(process) => process,
            Artifact::Scorecard(scorecard) => scorecard.process(),
        }
    }

    /// Features monitored: every fitted feature, or only the scorecard's
    fn features(&self) -> Vec<&str> {
        match self {
            Artifact::Binning(process) => process.feature_names(),
            Artifact::Scorecard(scorecard) => scorecard.features(),
        }
    }
}

pub fn run_psi(args: &PsiArgs, quiet: bool) -> Result<()> {
    let output_path = args.output_path();
    if !quiet {
        print_banner(env!("CARGO_PKG_VERSION"));
        print_run_card(&args.actual, None, Some(&output_path));
        println!();
    }

    let artifact = Artifact::load(args)?;
    let features = artifact.features();

    let spinner = create_spinner("Reading datasets...", quiet);
    let expected_df = read_frame(&args.expected)?;
    let actual_df = read_frame(&args.actual)?;
    let expected = scoring_dataset(&expected_df, &features)
        .with_context(|| format!("Expected file {}", args.expected.display()))?;
    let actual = scoring_dataset(&actual_df, &features)
        .with_context(|| format!("Actual file {}", args.actual.display()))?;
    finish_with_success(
        &spinner,
        &format!(
            "Loaded {} expected and {} actual rows",
            expected.n_rows(),
            actual.n_rows()
        ),
    );

    let spinner = create_spinner("Computing PSI...", quiet);
    let mut results = compute_psi_for(artifact.process(), &features, &expected, &actual)?;
    if let Artifact::Scorecard(scorecard) = &artifact {
        results.push(compute_score_psi(scorecard, &expected, &actual, args.score_bins)?);
    }
    let shifted = results
        .iter()
        .filter(|r| PsiLevel::from_psi(r.psi) == PsiLevel::Significant)
        .count();
    if shifted > 0 {
        finish_with_warning(
            &spinner,
            &format!("{} distribution(s) with a significant shift", shifted),
        );
    } else {
        finish_with_success(&spinner, "PSI computed");
    }

    let mut table = psi_rows_to_frame(&psi_table(&results))?;
    save_dataset(&mut table, &output_path)?;

    if !quiet {
        print_psi_summary(&results);
        print_success(&format!("Saved PSI table to {}", output_path.display()));
    }

    if let Some(report_path) = &args.report {
        let report = PsiReport::new(RunMetadata::new(&args.actual, None), &args.expected, results);
        write_json_report(&report, report_path)?;
        if !quiet {
            print_success(&format!("Saved report to {}", report_path.display()));
        }
    }

    if !quiet {
        print_completion("Monitoring complete!");
    }
    Ok(())
}
