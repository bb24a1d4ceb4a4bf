//! `scorebin transform`: encode a file with a fitted binning process

use anyhow::{Context, Result};

use super::args::TransformArgs;
use crate::pipeline::loader::{
    passthrough_columns, read_frame, save_dataset, scoring_dataset, transformed_to_frame,
};
use crate::pipeline::BinningProcess;
use crate::utils::{
    create_spinner, finish_with_success, print_banner, print_completion, print_info,
    print_run_card, print_warning,
};

pub fn run_transform(args: &TransformArgs, quiet: bool) -> Result<()> {
    let output_path = args.output_path();
    if !quiet {
        print_banner(env!("CARGO_PKG_VERSION"));
        print_run_card(&args.input, None, Some(&output_path));
        println!();
    }

    let process = BinningProcess::load(&args.binning)
        .with_context(|| format!("Failed to load binning artifact {}", args.binning.display()))?;

    let spinner = create_spinner("Reading dataset...", quiet);
    let df = read_frame(&args.input)?;
    let dataset = scoring_dataset(&df, &process.feature_names())?;
    finish_with_success(&spinner, &format!("Loaded {} rows", dataset.n_rows()));

    let spinner = create_spinner(&format!("Encoding {} feature(s)...", process.results().len()), quiet);
    let transformed = process.transform(&dataset, args.metric)?;
    let passthrough = passthrough_columns(&df, &args.keep)?;
    let mut output = transformed_to_frame(&transformed, passthrough)?;
    save_dataset(&mut output, &output_path)?;
    finish_with_success(&spinner, &format!("Saved to {}", output_path.display()));

    if !quiet {
        let mut clean = true;
        for (feature, diagnostics) in &transformed.diagnostics {
            if diagnostics.is_clean() {
                continue;
            }
            clean = false;
            print_warning(&format!(
                "{}: {} out-of-range value(s) clamped, {} unseen category value(s)",
                feature,
                diagnostics.out_of_range(),
                diagnostics.unseen()
            ));
        }
        if clean {
            print_info("Every value fell inside the fitted bins");
        }
        print_completion("Transform complete!");
    }
    Ok(())
}
