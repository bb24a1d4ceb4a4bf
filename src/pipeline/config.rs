//! Fit configuration for the binning process
//!
//! `FitConfig` is an explicit, immutable value threaded through `fit`. It can
//! be read from a JSON file (all fields optional) and is stored inside the
//! fitted artifact so a process always carries the parameters it was fit with.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::dataset::FeatureKind;
use super::error::{BinningError, Result};

/// Default fraction of observations required per prebin
pub const DEFAULT_MIN_PREBIN_SIZE: f64 = 1e-4;

/// Default upper bound on the number of quantile prebins
pub const DEFAULT_MAX_N_PREBINS: usize = 20;

/// Default fraction of observations required per final bin
pub const DEFAULT_MIN_BIN_SIZE: f64 = 0.05;

/// Default maximum number of value bins per feature
pub const DEFAULT_MAX_BINS: usize = 10;

/// Monotonic trend of the event rate across ordered bins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonotonicTrend {
    /// Event rate must increase with the feature value
    Ascending,
    /// Event rate must decrease with the feature value
    Descending,
    /// Pick whichever direction needs fewer merges
    #[default]
    Auto,
    /// No monotonicity constraint
    None,
}

impl MonotonicTrend {
    /// True for the two directions that impose an ordering constraint
    pub fn is_directional(self) -> bool {
        matches!(self, MonotonicTrend::Ascending | MonotonicTrend::Descending)
    }
}

impl std::fmt::Display for MonotonicTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonotonicTrend::Ascending => write!(f, "ascending"),
            MonotonicTrend::Descending => write!(f, "descending"),
            MonotonicTrend::Auto => write!(f, "auto"),
            MonotonicTrend::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for MonotonicTrend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ascending" | "asc" => Ok(MonotonicTrend::Ascending),
            "descending" | "desc" => Ok(MonotonicTrend::Descending),
            "auto" => Ok(MonotonicTrend::Auto),
            "none" => Ok(MonotonicTrend::None),
            _ => Err(format!(
                "Unknown monotonic trend: '{}'. Use 'ascending', 'descending', 'auto' or 'none'.",
                s
            )),
        }
    }
}

/// Per-feature overrides of the global fit parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureParams {
    pub monotonic_trend: Option<MonotonicTrend>,
    pub max_bins: Option<usize>,
    pub min_bin_size: Option<f64>,
    /// Explicit ordering of category labels; enables a trend on a categorical feature
    pub category_order: Option<Vec<String>>,
}

/// Global fit parameters plus per-feature overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitConfig {
    /// Minimum prebin population as a fraction of clean observations
    pub min_prebin_size: f64,
    /// Maximum number of quantile prebins for numeric features
    pub max_n_prebins: usize,
    /// Minimum final bin population as a fraction of clean observations
    pub min_bin_size: f64,
    /// Maximum number of value bins per feature
    pub max_bins: usize,
    /// Trend applied to features without an override
    pub monotonic_trend: MonotonicTrend,
    /// Sentinel values routed to their own bins
    pub special_codes: Vec<f64>,
    /// Features to treat as categorical regardless of dtype
    pub categorical_features: Vec<String>,
    /// Categories below this frequency fraction are grouped into "other"
    pub cat_cutoff: Option<f64>,
    /// Per-feature overrides keyed by feature name
    pub features: BTreeMap<String, FeatureParams>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            min_prebin_size: DEFAULT_MIN_PREBIN_SIZE,
            max_n_prebins: DEFAULT_MAX_N_PREBINS,
            min_bin_size: DEFAULT_MIN_BIN_SIZE,
            max_bins: DEFAULT_MAX_BINS,
            monotonic_trend: MonotonicTrend::Auto,
            special_codes: Vec::new(),
            categorical_features: Vec::new(),
            cat_cutoff: None,
            features: BTreeMap::new(),
        }
    }
}

/// Parameters resolved for a single feature
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams<'a> {
    pub trend: MonotonicTrend,
    pub max_bins: usize,
    pub min_bin_size: f64,
    pub min_prebin_size: f64,
    pub max_n_prebins: usize,
    pub cat_cutoff: f64,
    pub category_order: Option<&'a [String]>,
}

impl FitConfig {
    /// Read a configuration from a JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let config: FitConfig = serde_json::from_str(text)
            .map_err(|e| BinningError::Configuration(format!("malformed fit configuration: {}", e)))?;
        Ok(config)
    }

    /// Whether the named feature was declared categorical
    pub fn is_declared_categorical(&self, name: &str) -> bool {
        self.categorical_features.iter().any(|c| c == name)
    }

    /// Resolve the effective parameters for a feature
    pub fn params_for(&self, name: &str) -> ResolvedParams<'_> {
        let overrides = self.features.get(name);
        ResolvedParams {
            trend: overrides
                .and_then(|p| p.monotonic_trend)
                .unwrap_or(self.monotonic_trend),
            max_bins: overrides.and_then(|p| p.max_bins).unwrap_or(self.max_bins),
            min_bin_size: overrides
                .and_then(|p| p.min_bin_size)
                .unwrap_or(self.min_bin_size),
            min_prebin_size: self.min_prebin_size,
            max_n_prebins: self.max_n_prebins,
            cat_cutoff: self.cat_cutoff.unwrap_or(self.min_prebin_size),
            category_order: overrides.and_then(|p| p.category_order.as_deref()),
        }
    }

    /// Validate the global parameters
    pub fn validate(&self) -> Result<()> {
        validate_fraction("min_prebin_size", self.min_prebin_size, false)?;
        validate_fraction("min_bin_size", self.min_bin_size, true)?;
        if let Some(cutoff) = self.cat_cutoff {
            validate_fraction("cat_cutoff", cutoff, true)?;
        }
        if self.max_bins < 1 {
            return Err(BinningError::Configuration(format!(
                "max_bins must be >= 1, got {}",
                self.max_bins
            )));
        }
        if self.max_n_prebins < 2 {
            return Err(BinningError::Configuration(format!(
                "max_n_prebins must be >= 2, got {}",
                self.max_n_prebins
            )));
        }
        if let Some(code) = self.special_codes.iter().find(|c| !c.is_finite()) {
            return Err(BinningError::Configuration(format!(
                "special codes must be finite numbers, got {}",
                code
            )));
        }
        for (i, code) in self.special_codes.iter().enumerate() {
            if self.special_codes[..i].contains(code) {
                return Err(BinningError::Configuration(format!(
                    "special code {} is listed more than once",
                    code
                )));
            }
        }

        for (name, params) in &self.features {
            if let Some(max_bins) = params.max_bins {
                if max_bins < 1 {
                    return Err(BinningError::Configuration(format!(
                        "max_bins for feature '{}' must be >= 1, got {}",
                        name, max_bins
                    )));
                }
            }
            if let Some(size) = params.min_bin_size {
                validate_fraction(&format!("min_bin_size for feature '{}'", name), size, true)?;
            }
        }

        Ok(())
    }

    /// Validate the configuration against the kinds of the features to fit.
    ///
    /// Uses only column metadata, so it runs before any value is scanned.
    pub fn validate_features(&self, features: &[(&str, FeatureKind)]) -> Result<()> {
        self.validate()?;

        for (name, kind) in features {
            let params = self.features.get(*name);
            let trend = params.and_then(|p| p.monotonic_trend);
            let has_order = params.is_some_and(|p| p.category_order.is_some());

            match kind {
                FeatureKind::Categorical => {
                    if trend.is_some_and(MonotonicTrend::is_directional) && !has_order {
                        return Err(BinningError::Configuration(format!(
                            "feature '{}' is categorical; a '{}' trend needs an explicit category_order",
                            name,
                            trend.unwrap_or_default()
                        )));
                    }
                }
                FeatureKind::Numeric => {
                    if has_order {
                        return Err(BinningError::Configuration(format!(
                            "feature '{}' is numeric; category_order only applies to categorical features",
                            name
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

fn validate_fraction(name: &str, value: f64, allow_zero: bool) -> Result<()> {
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if !value.is_finite() || !lower_ok || value > 0.5 {
        let range = if allow_zero { "[0, 0.5]" } else { "(0, 0.5]" };
        return Err(BinningError::Configuration(format!(
            "{} must be a fraction in {}, got {}",
            name, range, value
        )));
    }
    Ok(())
}
