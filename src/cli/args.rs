//! Command-line argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::pipeline::{FitConfig, Metric, MonotonicTrend, ScalingParams};

/// scorebin - Monotonic optimal binning, WoE scorecards and PSI monitoring
#[derive(Parser, Debug)]
#[command(name = "scorebin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Suppress banners, spinners and tables
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit the binning process (and optionally a scorecard) on a training file
    Fit(FitArgs),

    /// Apply a fitted binning process to a file
    Transform(TransformArgs),

    /// Score a file with a fitted scorecard
    Score(ScoreArgs),

    /// Population stability between an expected and an actual file
    Psi(PsiArgs),
}

#[derive(Args, Debug)]
pub struct FitArgs {
    /// Training file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Binary 0/1 target column
    #[arg(short, long)]
    pub target: String,

    /// JSON fit configuration; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where to write the binning artifact.
    /// Defaults to the input directory with a '_binning.json' suffix.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also fit a scorecard and write it to this path
    #[arg(long)]
    pub scorecard: Option<PathBuf>,

    /// Write a JSON fit report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Feature columns to bin (comma-separated). Defaults to every usable column.
    #[arg(long, value_delimiter = ',')]
    pub features: Vec<String>,

    /// Columns never used as features (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub drop_columns: Vec<String>,

    /// Columns to bin as categorical regardless of dtype (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub categorical: Vec<String>,

    /// Special codes routed to their own bins (comma-separated, e.g. -9,-8)
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub special_codes: Vec<f64>,

    /// Monotonic trend: "ascending", "descending", "auto" or "none"
    #[arg(long)]
    pub monotonic_trend: Option<MonotonicTrend>,

    /// Maximum number of value bins per feature
    #[arg(long)]
    pub max_bins: Option<usize>,

    /// Minimum bin size as a fraction of clean observations (0-1)
    #[arg(long, value_parser = validate_fraction)]
    pub min_bin_size: Option<f64>,

    /// Minimum prebin size as a fraction of clean observations (0-1)
    #[arg(long, value_parser = validate_fraction)]
    pub min_prebin_size: Option<f64>,

    /// Maximum number of quantile prebins
    #[arg(long)]
    pub max_n_prebins: Option<usize>,

    /// Categories below this frequency fraction are grouped into "other" (0-1)
    #[arg(long, value_parser = validate_fraction)]
    pub cat_cutoff: Option<f64>,

    /// Scorecard features need at least this IV
    #[arg(long, default_value = "0.02")]
    pub min_iv: f64,

    /// Scorecard features need at least this many value bins
    #[arg(long, default_value = "2")]
    pub min_n_bins: usize,

    /// Inverse L2 regularisation strength (C) of the logistic regression
    #[arg(long = "regularization", default_value = "3.0")]
    pub c: f64,

    /// Points to double the odds
    #[arg(long, default_value = "30")]
    pub pdo: f64,

    /// Good:bad odds at the reference score
    #[arg(long, default_value = "20")]
    pub odds: f64,

    /// Score assigned to the reference odds
    #[arg(long, default_value = "750")]
    pub scorecard_points: f64,

    /// Keep fractional points instead of rounding each bin
    #[arg(long, default_value = "false")]
    pub no_rounding: bool,

    /// Higher points mean higher risk
    #[arg(long, default_value = "false")]
    pub reverse: bool,

    /// Print the full binning table of every feature
    #[arg(long, default_value = "false")]
    pub show_bins: bool,
}

impl FitArgs {
    /// Load the configuration file (if any) and apply flag overrides
    pub fn fit_config(&self) -> anyhow::Result<FitConfig> {
        let mut config = match &self.config {
            Some(path) => FitConfig::from_path(path)?,
            None => FitConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut FitConfig) {
        if let Some(trend) = self.monotonic_trend {
            config.monotonic_trend = trend;
        }
        if let Some(max_bins) = self.max_bins {
            config.max_bins = max_bins;
        }
        if let Some(min_bin_size) = self.min_bin_size {
            config.min_bin_size = min_bin_size;
        }
        if let Some(min_prebin_size) = self.min_prebin_size {
            config.min_prebin_size = min_prebin_size;
        }
        if let Some(max_n_prebins) = self.max_n_prebins {
            config.max_n_prebins = max_n_prebins;
        }
        if self.cat_cutoff.is_some() {
            config.cat_cutoff = self.cat_cutoff;
        }
        if !self.special_codes.is_empty() {
            config.special_codes = self.special_codes.clone();
        }
        for name in &self.categorical {
            if !config.categorical_features.contains(name) {
                config.categorical_features.push(name.clone());
            }
        }
    }

    pub fn scaling(&self) -> ScalingParams {
        ScalingParams {
            pdo: self.pdo,
            odds: self.odds,
            scorecard_points: self.scorecard_points,
            rounding: !self.no_rounding,
            reverse: self.reverse,
        }
    }

    /// Artifact path, deriving from input if not explicitly provided
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| derived_path(&self.input, "_binning", "json"))
    }
}

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Fitted binning artifact
    #[arg(short, long)]
    pub binning: PathBuf,

    /// Output file path (CSV or Parquet, determined by extension).
    /// Defaults to the input directory with a '_<metric>' suffix.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Encoding: "woe", "bins" or "indices"
    #[arg(short, long, default_value = "woe")]
    pub metric: Metric,

    /// Columns copied unchanged into the output (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub keep: Vec<String>,
}

impl TransformArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            derived_path(&self.input, &format!("_{}", self.metric), extension_or(&self.input, "csv"))
        })
    }
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Fitted scorecard artifact
    #[arg(short, long)]
    pub scorecard: PathBuf,

    /// Output file path (CSV or Parquet, determined by extension).
    /// Defaults to the input directory with a '_scored' suffix.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Columns copied unchanged into the output (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub keep: Vec<String>,

    /// Target column; when present, AUC, Gini and KS are reported
    #[arg(short, long)]
    pub target: Option<String>,
}

impl ScoreArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| derived_path(&self.input, "_scored", extension_or(&self.input, "csv")))
    }
}

#[derive(Args, Debug)]
pub struct PsiArgs {
    /// Reference (expected) file, usually the training sample
    #[arg(short, long)]
    pub expected: PathBuf,

    /// Current (actual) file
    #[arg(short, long)]
    pub actual: PathBuf,

    /// Fitted binning artifact
    #[arg(short, long, required_unless_present = "scorecard")]
    pub binning: Option<PathBuf>,

    /// Fitted scorecard artifact; adds the score distribution to the table
    #[arg(short, long, conflicts_with = "binning")]
    pub scorecard: Option<PathBuf>,

    /// Number of equal-frequency score bins
    #[arg(long, default_value = "10")]
    pub score_bins: usize,

    /// PSI table output (CSV or Parquet). Defaults to '<actual>_psi.csv'.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a JSON PSI report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl PsiArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| derived_path(&self.actual, "_psi", "csv"))
    }
}

fn extension_or<'a>(path: &'a Path, default: &'a str) -> &'a str {
    path.extension().and_then(|e| e.to_str()).unwrap_or(default)
}

/// Sibling of `input` named '<stem><suffix>.<extension>'
fn derived_path(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    parent.join(format!("{}{}.{}", stem, suffix, extension))
}

/// Validator for parameters expressed as a fraction of observations
fn validate_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..=1.0).contains(&value) {
        Err(format!("value must be between 0.0 and 1.0, got {}", value))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("scorebin").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_fit_flags_override_config() {
        let cli = parse(&[
            "fit",
            "-i",
            "data/train.csv",
            "-t",
            "default",
            "--max-bins",
            "6",
            "--special-codes",
            "-9,-8",
            "--monotonic-trend",
            "descending",
            "--categorical",
            "region",
        ]);
        let Commands::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let mut config = FitConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.max_bins, 6);
        assert_eq!(config.special_codes, vec![-9.0, -8.0]);
        assert_eq!(config.monotonic_trend, MonotonicTrend::Descending);
        assert_eq!(config.categorical_features, vec!["region".to_string()]);
        // Untouched fields keep their defaults
        assert_eq!(config.min_bin_size, FitConfig::default().min_bin_size);
        assert_eq!(args.output_path(), PathBuf::from("data/train_binning.json"));
    }

    #[test]
    fn test_fraction_validation() {
        let result = Cli::try_parse_from([
            "scorebin", "fit", "-i", "a.csv", "-t", "y", "--min-bin-size", "1.5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_transform_default_output() {
        let cli = parse(&["transform", "-i", "x/new.parquet", "-b", "model.json", "-m", "bins"]);
        let Commands::Transform(args) = cli.command else {
            panic!("expected transform");
        };
        assert_eq!(args.metric, Metric::Bins);
        assert_eq!(args.output_path(), PathBuf::from("x/new_bins.parquet"));
    }

    #[test]
    fn test_psi_requires_an_artifact() {
        assert!(Cli::try_parse_from(["scorebin", "psi", "-e", "a.csv", "-a", "b.csv"]).is_err());
        let cli = parse(&["psi", "-e", "a.csv", "-a", "b.csv", "-s", "card.json"]);
        let Commands::Psi(args) = cli.command else {
            panic!("expected psi");
        };
        assert_eq!(args.output_path(), PathBuf::from("b_psi.csv"));
    }
}
