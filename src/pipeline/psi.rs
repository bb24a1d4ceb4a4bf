//! Population Stability Index monitoring
//!
//! PSI compares the share of observations per bin between a reference
//! ("expected") and a current ("actual") dataset:
//!
//! ```text
//! psi = sum((actual% - expected%) * ln(actual% / expected%))
//! ```
//!
//! Bins come from the fitted binning process; nothing is refitted.

use rayon::prelude::*;
use serde::Serialize;

use super::dataset::Dataset;
use super::error::{BinningError, Result};
use super::process::BinningProcess;
use super::scorecard::Scorecard;

/// Added to every compared bin count of a side that has an empty bin
pub const PSI_SMOOTHING: f64 = 0.5;

/// Default number of equal-frequency bins for score PSI
pub const DEFAULT_SCORE_BINS: usize = 10;

/// Name used for the score distribution in PSI tables
pub const SCORE_FEATURE: &str = "score";

/// Conventional reading of a PSI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PsiLevel {
    /// Below 0.1
    Stable,
    /// From 0.1 up to 0.25
    Moderate,
    /// Above 0.25
    Significant,
}

impl PsiLevel {
    pub fn from_psi(psi: f64) -> Self {
        if psi < 0.1 {
            PsiLevel::Stable
        } else if psi <= 0.25 {
            PsiLevel::Moderate
        } else {
            PsiLevel::Significant
        }
    }
}

impl std::fmt::Display for PsiLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PsiLevel::Stable => write!(f, "stable"),
            PsiLevel::Moderate => write!(f, "moderate shift"),
            PsiLevel::Significant => write!(f, "significant shift"),
        }
    }
}

/// PSI contribution of one bin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PsiBin {
    pub bin: String,
    pub expected_count: usize,
    pub actual_count: usize,
    pub expected_pct: f64,
    pub actual_pct: f64,
    pub psi: f64,
}

/// PSI of one feature (or of the score)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturePsi {
    pub feature: String,
    pub bins: Vec<PsiBin>,
    pub psi: f64,
}

/// One row of the flat monitoring table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PsiRow {
    pub feature: String,
    pub bin: String,
    pub expected_pct: f64,
    pub actual_pct: f64,
    pub psi: f64,
}

/// Bin proportions of one side; smoothed when any compared bin is empty
fn proportions(counts: &[usize]) -> Vec<f64> {
    let n: usize = counts.iter().sum();
    let k = counts.len() as f64;
    if counts.iter().any(|&c| c == 0) {
        counts
            .iter()
            .map(|&c| (c as f64 + PSI_SMOOTHING) / (n as f64 + PSI_SMOOTHING * k))
            .collect()
    } else {
        counts.iter().map(|&c| c as f64 / n as f64).collect()
    }
}

/// PSI from per-bin counts. Bins empty on both sides are skipped.
pub fn psi_from_counts(feature: &str, labels: &[String], expected: &[usize], actual: &[usize]) -> FeaturePsi {
    let compared: Vec<usize> = (0..labels.len())
        .filter(|&i| expected[i] > 0 || actual[i] > 0)
        .collect();

    let exp_counts: Vec<usize> = compared.iter().map(|&i| expected[i]).collect();
    let act_counts: Vec<usize> = compared.iter().map(|&i| actual[i]).collect();
    let exp_pct = proportions(&exp_counts);
    let act_pct = proportions(&act_counts);

    let bins: Vec<PsiBin> = compared
        .iter()
        .enumerate()
        .map(|(j, &i)| {
            let (e, a) = (exp_pct[j], act_pct[j]);
            PsiBin {
                bin: labels[i].clone(),
                expected_count: expected[i],
                actual_count: actual[i],
                expected_pct: e,
                actual_pct: a,
                psi: (a - e) * (a / e).ln(),
            }
        })
        .collect();

    let psi = bins.iter().map(|b| b.psi).sum();
    FeaturePsi {
        feature: feature.to_string(),
        bins,
        psi,
    }
}

fn slot_counts(process: &BinningProcess, dataset: &Dataset, name: &str, n_slots: usize) -> Result<Vec<usize>> {
    let result = process
        .result(name)
        .ok_or_else(|| BinningError::MissingFeature(name.to_string()))?;
    let values = process.values_for(dataset, name)?;
    let assigner = result.assigner();

    let mut counts = vec![0usize; n_slots];
    for assignment in assigner.assign_all(values) {
        counts[assigner.slot(assignment)] += 1;
    }
    Ok(counts)
}

/// PSI of every fitted feature between two datasets
pub fn compute_psi(process: &BinningProcess, expected: &Dataset, actual: &Dataset) -> Result<Vec<FeaturePsi>> {
    compute_psi_for(process, &process.feature_names(), expected, actual)
}

/// PSI of the named fitted features only, in the given order
pub fn compute_psi_for(
    process: &BinningProcess,
    features: &[&str],
    expected: &Dataset,
    actual: &Dataset,
) -> Result<Vec<FeaturePsi>> {
    features
        .par_iter()
        .map(|name| {
            let result = process
                .result(name)
                .ok_or_else(|| BinningError::MissingFeature(name.to_string()))?;
            let n_slots = result.n_slots();
            let labels: Vec<String> = (0..n_slots).map(|s| result.slot_label(s)).collect();
            let e = slot_counts(process, expected, &result.name, n_slots)?;
            let a = slot_counts(process, actual, &result.name, n_slots)?;
            Ok(psi_from_counts(&result.name, &labels, &e, &a))
        })
        .collect()
}

/// Equal-frequency cut points of the expected scores
fn score_edges(expected: &[f64], n_bins: usize) -> Vec<f64> {
    let mut sorted: Vec<f64> = expected.iter().copied().filter(|s| s.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let mut edges: Vec<f64> = Vec::new();
    for i in 1..n_bins {
        let idx = (i * n) / n_bins;
        if idx == 0 || idx >= n {
            continue;
        }
        let edge = sorted[idx];
        // A cut must separate distinct scores
        if edge > sorted[0] && edges.last().map_or(true, |&last| edge > last) {
            edges.push(edge);
        }
    }
    edges
}

fn edge_labels(edges: &[f64]) -> Vec<String> {
    let bounds: Vec<String> = std::iter::once("-inf".to_string())
        .chain(edges.iter().map(|e| e.to_string()))
        .chain(std::iter::once("inf".to_string()))
        .collect();
    bounds
        .windows(2)
        .map(|w| format!("[{}, {})", w[0], w[1]))
        .collect()
}

fn histogram(scores: &[f64], edges: &[f64]) -> Vec<usize> {
    let mut counts = vec![0usize; edges.len() + 1];
    for &s in scores {
        counts[edges.partition_point(|&e| e <= s)] += 1;
    }
    counts
}

/// PSI of the score distribution over `n_bins` equal-frequency bins of the
/// expected scores
pub fn compute_score_psi(
    scorecard: &Scorecard,
    expected: &Dataset,
    actual: &Dataset,
    n_bins: usize,
) -> Result<FeaturePsi> {
    if n_bins < 2 {
        return Err(BinningError::Configuration(format!(
            "score PSI needs at least 2 bins, got {}",
            n_bins
        )));
    }
    let expected_scores = scorecard.score(expected)?;
    let actual_scores = scorecard.score(actual)?;
    Ok(score_psi(&expected_scores, &actual_scores, n_bins))
}

/// Score PSI from precomputed scores
pub fn score_psi(expected_scores: &[f64], actual_scores: &[f64], n_bins: usize) -> FeaturePsi {
    let edges = score_edges(expected_scores, n_bins);
    let labels = edge_labels(&edges);
    psi_from_counts(
        SCORE_FEATURE,
        &labels,
        &histogram(expected_scores, &edges),
        &histogram(actual_scores, &edges),
    )
}

/// Flatten PSI results into (feature, bin, expected %, actual %, psi) rows
pub fn psi_table(results: &[FeaturePsi]) -> Vec<PsiRow> {
    results
        .iter()
        .flat_map(|f| {
            f.bins.iter().map(move |b| PsiRow {
                feature: f.feature.clone(),
                bin: b.bin.clone(),
                expected_pct: b.expected_pct,
                actual_pct: b.actual_pct,
                psi: b.psi,
            })
        })
        .collect()
}
