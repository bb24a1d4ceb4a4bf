//! `scorebin score`: apply a fitted scorecard to a file

use anyhow::{Context, Result};
use tracing::info;

use super::args::ScoreArgs;
use crate::pipeline::loader::{
    extract_target, passthrough_columns, read_frame, save_dataset, scores_to_frame,
    scoring_dataset,
};
use crate::pipeline::{PerformanceMetrics, PopulationDistribution, Scorecard};
use crate::report::print_performance;
use crate::utils::{
    create_spinner, finish_with_success, print_banner, print_completion, print_info,
    print_run_card,
};

pub fn run_score(args: &ScoreArgs, quiet: bool) -> Result<()> {
    let output_path = args.output_path();
    if !quiet {
        print_banner(env!("CARGO_PKG_VERSION"));
        print_run_card(&args.input, args.target.as_deref(), Some(&output_path));
        println!();
    }

    let scorecard = Scorecard::load(&args.scorecard)
        .with_context(|| format!("Failed to load scorecard {}", args.scorecard.display()))?;

    let spinner = create_spinner("Reading dataset...", quiet);
    let df = read_frame(&args.input)?;
    let dataset = scoring_dataset(&df, &scorecard.features())?;
    finish_with_success(&spinner, &format!("Loaded {} rows", dataset.n_rows()));

    let spinner = create_spinner("Scoring...", quiet);
    let scores = scorecard.score(&dataset)?;
    let probabilities = scorecard.predict_proba(&dataset)?;
    let passthrough = passthrough_columns(&df, &args.keep)?;
    let mut output = scores_to_frame(&scores, &probabilities, passthrough)?;
    save_dataset(&mut output, &output_path)?;
    finish_with_success(&spinner, &format!("Saved to {}", output_path.display()));

    if !quiet {
        let mean = scores.iter().sum::<f64>() / scores.len().max(1) as f64;
        print_info(&format!("Mean score: {:.1}", mean));
    }

    if let Some(target) = &args.target {
        // Rows with a null target are left out of the metrics only
        let raw = extract_target(&df, target)?;
        let (labels, preds): (Vec<u8>, Vec<f64>) = raw
            .iter()
            .zip(&probabilities)
            .filter_map(|(t, p)| t.map(|t| (t, *p)))
            .unzip();
        let population = PopulationDistribution::from_target(&labels);
        let metrics = PerformanceMetrics::compute(&labels, &preds)?;
        info!(auc = metrics.auc, gini = metrics.gini, ks = metrics.ks, "scored population");
        if !quiet {
            print_performance(&population, Some(&metrics));
        }
    }

    if !quiet {
        print_completion("Scoring complete!");
    }
    Ok(())
}
