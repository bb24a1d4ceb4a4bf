//! `scorebin fit`: bin a training file and optionally fit a scorecard

use std::time::Instant;

use anyhow::{Context, Result};

use super::args::FitArgs;
use crate::pipeline::loader::{read_frame, training_data};
use crate::pipeline::{
    BinningProcess, LogisticRegression, PerformanceMetrics, PopulationDistribution, Scorecard,
};
use crate::report::{
    print_binning_summary, print_binning_table, print_performance, print_points_table,
    write_json_report, FitReport, RunMetadata,
};
use crate::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_info, print_run_card, print_step_header, print_step_time, print_success, print_warning,
};

pub fn run_fit(args: &FitArgs, quiet: bool) -> Result<()> {
    let config = args.fit_config()?;
    config
        .validate()
        .context("Invalid fit configuration")?;

    let output_path = args.output_path();
    if !quiet {
        print_banner(env!("CARGO_PKG_VERSION"));
        print_run_card(&args.input, Some(&args.target), Some(&output_path));
    }

    // Step 1: Load
    if !quiet {
        print_step_header(1, "Load Training Data");
    }
    let step_start = Instant::now();
    let spinner = create_spinner("Reading dataset...", quiet);
    let mut df = read_frame(&args.input)?;
    if !args.drop_columns.is_empty() {
        df = df.drop_many(&args.drop_columns);
    }
    let features = (!args.features.is_empty()).then_some(args.features.as_slice());
    let data = training_data(&df, &args.target, features)?;
    finish_with_success(
        &spinner,
        &format!(
            "Loaded {} rows × {} features",
            data.dataset.n_rows(),
            data.dataset.features().len()
        ),
    );
    if !quiet {
        if data.dropped_rows > 0 {
            print_warning(&format!(
                "Dropped {} row(s) with a missing target",
                data.dropped_rows
            ));
        }
        print_step_time(step_start.elapsed());
    }

    // Step 2: Binning
    if !quiet {
        print_step_header(2, "Optimal Binning");
    }
    let step_start = Instant::now();
    let spinner = create_spinner("Fitting monotonic binning...", quiet);
    let process = BinningProcess::fit(&data.dataset, &data.target, &config)?;
    let degenerate = process.results().iter().filter(|r| r.has_warnings()).count();
    if degenerate > 0 {
        finish_with_warning(
            &spinner,
            &format!("Binning complete ({} feature(s) with warnings)", degenerate),
        );
    } else {
        finish_with_success(&spinner, "Binning complete");
    }
    process
        .save(&output_path)
        .with_context(|| format!("Failed to write binning artifact to {}", output_path.display()))?;
    if !quiet {
        print_binning_summary(&process.summary());
        if args.show_bins {
            for name in process.feature_names() {
                if let Some(rows) = process.binning_table(name) {
                    print_binning_table(name, &rows);
                }
            }
        }
        print_success(&format!("Saved binning to {}", output_path.display()));
        print_step_time(step_start.elapsed());
    }

    // Step 3: Scorecard
    let selected = process.select(args.min_iv, args.min_n_bins);
    let population = PopulationDistribution::from_target(&data.target);
    let mut performance = None;

    if let Some(scorecard_path) = &args.scorecard {
        if !quiet {
            print_step_header(3, "Scorecard");
        }
        if selected.is_empty() {
            anyhow::bail!(
                "No feature reaches IV >= {} with at least {} bins; cannot fit a scorecard",
                args.min_iv,
                args.min_n_bins
            );
        }
        if !quiet {
            print_info(&format!(
                "{} of {} feature(s) selected (IV >= {})",
                selected.len(),
                process.results().len(),
                args.min_iv
            ));
        }

        let step_start = Instant::now();
        let spinner = create_spinner("Fitting logistic regression...", quiet);
        let estimator = LogisticRegression::with_c(args.c);
        let scorecard = Scorecard::fit(
            &process,
            &data.dataset,
            &data.target,
            &estimator,
            args.scaling(),
            Some(&selected),
        )?;
        finish_with_success(&spinner, "Scorecard fitted");

        let probabilities = scorecard.predict_proba(&data.dataset)?;
        let metrics = PerformanceMetrics::compute(&data.target, &probabilities)?;
        performance = Some(metrics);

        scorecard
            .save(scorecard_path)
            .with_context(|| format!("Failed to write scorecard to {}", scorecard_path.display()))?;
        if !quiet {
            print_points_table(&scorecard.points_table());
            print_success(&format!("Saved scorecard to {}", scorecard_path.display()));
            print_step_time(step_start.elapsed());
        }
    }

    if !quiet {
        print_performance(&population, performance.as_ref());
    }

    if let Some(report_path) = &args.report {
        let report = FitReport::new(
            RunMetadata::new(&args.input, Some(&args.target)),
            &process,
            &selected,
            population,
            performance,
        );
        write_json_report(&report, report_path)?;
        if !quiet {
            print_success(&format!("Saved report to {}", report_path.display()));
        }
    }

    if !quiet {
        print_completion("Fit complete!");
    }
    Ok(())
}
