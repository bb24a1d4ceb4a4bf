//! Supervised optimal binning of a single feature
//!
//! A feature is fitted in four stages: clean observations are split off from
//! special codes and missing values, the clean domain is prebinned, adjacent
//! prebins are merged under the monotonicity, size and count constraints, and
//! the final layout is annotated with WoE/IV by running the same assignment
//! that `transform` uses.

pub mod merge;
pub mod prebin;
pub mod transform;
pub mod woe;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::{FitConfig, MonotonicTrend};
use super::dataset::{Feature, FeatureKind, FeatureValues};
use super::error::Result;

pub use merge::{optimize, MergeOutcome};
pub use prebin::{prebin_categorical, prebin_numeric, LabelGroup, Prebins};
pub use transform::{
    transform_feature, Assignment, BinAssigner, Metric, TransformDiagnostics, TransformedColumn,
    TransformedValues,
};
pub use woe::{compute_stats, woe_iv, WOE_SMOOTHING};

/// Label of the reserved slot for categories never seen at fit time
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Event / non-event tallies for a group of observations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub events: usize,
    pub non_events: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.events + self.non_events
    }

    pub fn event_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.events as f64 / n as f64,
        }
    }

    pub fn add(&mut self, target: u8) {
        if target == 1 {
            self.events += 1;
        } else {
            self.non_events += 1;
        }
    }

    pub fn merged(&self, other: &Counts) -> Counts {
        Counts {
            events: self.events + other.events,
            non_events: self.non_events + other.non_events,
        }
    }
}

/// What a bin covers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BinKind {
    /// Half-open interval `[lower, upper)`; `None` means unbounded
    Numeric {
        lower: Option<f64>,
        upper: Option<f64>,
    },
    /// Explicit set of labels. `includes_other` marks the bin that holds the
    /// rare-category group and absorbs unseen labels at transform time.
    Categorical {
        labels: Vec<String>,
        includes_other: bool,
    },
    Special {
        code: f64,
    },
    Missing,
}

impl BinKind {
    pub fn is_value_bin(&self) -> bool {
        matches!(self, BinKind::Numeric { .. } | BinKind::Categorical { .. })
    }

    /// Human-readable label used by the `bins` metric and in reports
    pub fn label(&self) -> String {
        match self {
            BinKind::Numeric { lower, upper } => {
                let lo = lower.map_or_else(|| "-inf".to_string(), |v| v.to_string());
                let hi = upper.map_or_else(|| "inf".to_string(), |v| v.to_string());
                format!("[{}, {})", lo, hi)
            }
            BinKind::Categorical {
                labels,
                includes_other,
            } => {
                if *includes_other {
                    format!("[{}] + other", labels.join(", "))
                } else {
                    format!("[{}]", labels.join(", "))
                }
            }
            BinKind::Special { code } => format!("Special {}", code),
            BinKind::Missing => "Missing".to_string(),
        }
    }
}

/// A fitted bin with its training statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    #[serde(flatten)]
    pub kind: BinKind,
    pub count: usize,
    pub event_count: usize,
    pub nonevent_count: usize,
    pub event_rate: f64,
    pub woe: f64,
    pub iv_contribution: f64,
}

/// Direction of the event rate across the fitted value bins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievedTrend {
    Ascending,
    Descending,
    None,
}

impl std::fmt::Display for AchievedTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AchievedTrend::Ascending => write!(f, "ascending"),
            AchievedTrend::Descending => write!(f, "descending"),
            AchievedTrend::None => write!(f, "none"),
        }
    }
}

/// Non-fatal degeneracy detected while fitting a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureWarning {
    /// Fewer than two distinct clean values; no split was possible
    InsufficientDistinctValues,
    /// Constraints left fewer than two value bins; a catch-all bin was emitted
    SingleBinFallback,
    /// Every observation was missing or a special code
    NoCleanValues,
}

impl std::fmt::Display for FeatureWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureWarning::InsufficientDistinctValues => write!(f, "insufficient distinct values"),
            FeatureWarning::SingleBinFallback => write!(f, "single bin fallback"),
            FeatureWarning::NoCleanValues => write!(f, "no clean values"),
        }
    }
}

/// Observed range of clean numeric values at fit time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

/// Fitted binning of one feature
///
/// Bins are laid out as value bins, then one bin per special code in
/// configured order, then the missing bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinningResult {
    pub name: String,
    pub kind: FeatureKind,
    pub bins: Vec<Bin>,
    pub total_iv: f64,
    pub requested_trend: MonotonicTrend,
    pub achieved_trend: AchievedTrend,
    pub n_value_bins: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_range: Option<ValueRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<FeatureWarning>,
}

impl BinningResult {
    pub fn value_bins(&self) -> &[Bin] {
        &self.bins[..self.n_value_bins]
    }

    pub fn special_bins(&self) -> impl Iterator<Item = &Bin> {
        self.bins
            .iter()
            .filter(|b| matches!(b.kind, BinKind::Special { .. }))
    }

    pub fn missing_bin(&self) -> Option<&Bin> {
        self.bins.iter().find(|b| b.kind == BinKind::Missing)
    }

    /// Slot index reserved for unseen categories
    pub fn unknown_slot(&self) -> usize {
        self.bins.len()
    }

    /// Number of slots a transform can emit, including the unknown slot
    pub fn n_slots(&self) -> usize {
        self.bins.len() + 1
    }

    pub fn slot_label(&self, slot: usize) -> String {
        self.bins
            .get(slot)
            .map_or_else(|| UNKNOWN_LABEL.to_string(), |b| b.kind.label())
    }

    pub fn slot_woe(&self, slot: usize) -> f64 {
        self.bins.get(slot).map_or(0.0, |b| b.woe)
    }

    /// Build the value-to-slot assigner for this result
    pub fn assigner(&self) -> BinAssigner<'_> {
        BinAssigner::new(
            self.kind,
            self.bins.iter().map(|b| &b.kind),
            self.value_range,
        )
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Clean observations of a feature, split off from specials and missing values
enum CleanValues<'a> {
    Numeric(Vec<(f64, u8)>),
    Categorical(Vec<(&'a str, u8)>),
}

impl CleanValues<'_> {
    fn len(&self) -> usize {
        match self {
            CleanValues::Numeric(v) => v.len(),
            CleanValues::Categorical(v) => v.len(),
        }
    }
}

/// Whether a categorical label spells one of the special codes
pub(crate) fn label_special_code(label: &str, special_codes: &[f64]) -> Option<f64> {
    let parsed: f64 = label.trim().parse().ok()?;
    special_codes.iter().copied().find(|&c| c == parsed)
}

fn clean_values<'a>(values: &'a FeatureValues, target: &[u8], special_codes: &[f64]) -> CleanValues<'a> {
    match values {
        FeatureValues::Numeric(vals) => CleanValues::Numeric(
            vals.iter()
                .zip(target)
                .filter_map(|(v, &t)| match v {
                    Some(x) if x.is_finite() && !special_codes.contains(x) => Some((*x, t)),
                    _ => None,
                })
                .collect(),
        ),
        FeatureValues::Categorical(vals) => CleanValues::Categorical(
            vals.iter()
                .zip(target)
                .filter_map(|(v, &t)| match v {
                    Some(s) if label_special_code(s, special_codes).is_none() => Some((s.as_str(), t)),
                    _ => None,
                })
                .collect(),
        ),
    }
}

/// Fit the binning of one feature.
///
/// `target` must already be validated as binary and aligned with the feature.
pub fn fit_feature(feature: &Feature, target: &[u8], config: &FitConfig) -> Result<BinningResult> {
    let params = config.params_for(&feature.name);
    let kind = feature.kind();
    let clean = clean_values(&feature.values, target, &config.special_codes);
    let n_clean = clean.len();

    let total = target.iter().fold(Counts::default(), |mut acc, &t| {
        acc.add(t);
        acc
    });

    let mut warnings = Vec::new();
    let mut value_range = None;

    // Ordering constraints only apply where the value bins carry an order
    let trend = match kind {
        FeatureKind::Categorical if params.category_order.is_none() => MonotonicTrend::None,
        _ => params.trend,
    };

    let prebins = match &clean {
        CleanValues::Numeric(pairs) => {
            if let (Some(min), Some(max)) = (
                pairs.iter().map(|p| p.0).reduce(f64::min),
                pairs.iter().map(|p| p.0).reduce(f64::max),
            ) {
                value_range = Some(ValueRange { min, max });
            }
            prebin_numeric(pairs, params.min_prebin_size, params.max_n_prebins)
        }
        CleanValues::Categorical(pairs) => {
            prebin_categorical(pairs, params.cat_cutoff, params.category_order)
        }
    };

    if n_clean == 0 {
        warnings.push(FeatureWarning::NoCleanValues);
    } else if prebins.n_distinct() < 2 {
        warnings.push(FeatureWarning::InsufficientDistinctValues);
    }

    let min_bin_count = (params.min_bin_size * n_clean as f64).ceil() as usize;
    let outcome = optimize(
        prebins.counts(),
        trend,
        params.max_bins,
        min_bin_count,
        total,
    );

    let single_bin = outcome.groups.len() < 2;
    if single_bin && prebins.len() >= 2 {
        warnings.push(FeatureWarning::SingleBinFallback);
    }

    let mut kinds: Vec<BinKind> = if single_bin {
        vec![prebins.catch_all()]
    } else {
        outcome
            .groups
            .iter()
            .map(|range| prebins.kind_for(range.clone()))
            .collect()
    };
    let n_value_bins = kinds.len();
    kinds.extend(config.special_codes.iter().map(|&code| BinKind::Special { code }));
    kinds.push(BinKind::Missing);

    let assigner = BinAssigner::new(kind, kinds.iter(), None);
    let slots = assigner.assign_all(&feature.values);
    let (mut bins, _) = compute_stats(&kinds, &slots, target, total);

    if single_bin {
        bins[0].woe = 0.0;
        bins[0].iv_contribution = 0.0;
    }

    let achieved_trend = if single_bin {
        AchievedTrend::None
    } else {
        match (kind, outcome.direction) {
            (_, Some(direction)) => direction,
            (FeatureKind::Categorical, None) if params.category_order.is_none() => AchievedTrend::None,
            (_, None) => observed_trend(&bins[..n_value_bins]),
        }
    };

    if kind == FeatureKind::Categorical {
        bins[..n_value_bins].sort_by(|a, b| a.woe.total_cmp(&b.woe));
    }

    let total_iv = bins.iter().map(|b| b.iv_contribution).sum::<f64>().max(0.0);

    for warning in &warnings {
        warn!(feature = %feature.name, %warning, "degenerate feature");
    }
    debug!(
        feature = %feature.name,
        prebins = prebins.len(),
        bins = n_value_bins,
        iv = total_iv,
        trend = %achieved_trend,
        "fitted feature binning"
    );

    Ok(BinningResult {
        name: feature.name.clone(),
        kind,
        bins,
        total_iv,
        requested_trend: params.trend,
        achieved_trend,
        n_value_bins,
        value_range,
        warnings,
    })
}

/// Direction of the event rate across value bins, if strictly monotonic
fn observed_trend(bins: &[Bin]) -> AchievedTrend {
    let rates: Vec<f64> = bins.iter().map(|b| b.event_rate).collect();
    if rates.len() < 2 {
        AchievedTrend::None
    } else if rates.windows(2).all(|w| w[0] < w[1]) {
        AchievedTrend::Ascending
    } else if rates.windows(2).all(|w| w[0] > w[1]) {
        AchievedTrend::Descending
    } else {
        AchievedTrend::None
    }
}
