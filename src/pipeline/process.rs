//! The binning process: fit artifact over many features
//!
//! `BinningProcess::fit` bins every feature of a dataset independently (one
//! rayon task per feature) and keeps the results in input order. The fitted
//! process is immutable; `transform` maps raw values to WoE, bin labels or
//! slot indices and never fails on unseen or out-of-range values.

use std::collections::BTreeMap;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::binning::{
    fit_feature, transform_feature, AchievedTrend, BinningResult, FeatureWarning, Metric,
    TransformDiagnostics, TransformedColumn,
};
use super::config::{FitConfig, MonotonicTrend};
use super::dataset::{validate_target, Dataset, Feature, FeatureKind, FeatureValues};
use super::error::{BinningError, Result};

/// Version of the serialized artifact layout
pub const FORMAT_VERSION: u32 = 1;

/// Fitted binning for a set of features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinningProcess {
    format_version: u32,
    config: FitConfig,
    results: Vec<BinningResult>,
}

/// Output of `BinningProcess::transform`
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedDataset {
    pub metric: Metric,
    pub columns: Vec<TransformedColumn>,
    pub diagnostics: BTreeMap<String, TransformDiagnostics>,
}

impl TransformedDataset {
    pub fn column(&self, name: &str) -> Option<&TransformedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// One row of `BinningProcess::summary`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSummary {
    pub name: String,
    pub kind: FeatureKind,
    pub n_bins: usize,
    pub iv: f64,
    pub requested_trend: MonotonicTrend,
    pub achieved_trend: AchievedTrend,
    pub warnings: Vec<FeatureWarning>,
}

/// One row of a feature's binning table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinningTableRow {
    pub bin: String,
    pub count: usize,
    pub count_pct: f64,
    pub event_count: usize,
    pub nonevent_count: usize,
    pub event_rate: f64,
    pub woe: f64,
    pub iv: f64,
}

#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: u32,
}

/// Check the format version before deserializing the full artifact
pub(crate) fn check_format_version(bytes: &[u8], expected: u32) -> Result<()> {
    let header: ArtifactHeader = serde_json::from_slice(bytes)?;
    if header.format_version != expected {
        return Err(BinningError::IncompatibleArtifact {
            found: header.format_version,
            expected,
        });
    }
    Ok(())
}

/// Render a numeric value as a category label, matching transform-time lookup
fn numeric_label(value: f64) -> String {
    value.to_string()
}

/// Convert numeric columns declared categorical into label columns
fn coerce_declared_categorical(feature: &Feature, config: &FitConfig) -> Option<Feature> {
    match &feature.values {
        FeatureValues::Numeric(values) if config.is_declared_categorical(&feature.name) => {
            Some(Feature::categorical(
                feature.name.clone(),
                values
                    .iter()
                    .map(|v| v.filter(|x| x.is_finite()).map(numeric_label))
                    .collect(),
            ))
        }
        _ => None,
    }
}

impl BinningProcess {
    /// Fit the binning of every feature in `dataset`.
    ///
    /// Configuration errors are raised from column metadata before any value
    /// is scanned. Degenerate features do not fail the fit; they carry
    /// warnings on their result.
    pub fn fit(dataset: &Dataset, target: &[u8], config: &FitConfig) -> Result<Self> {
        let kinds: Vec<(&str, FeatureKind)> = dataset
            .features()
            .iter()
            .map(|f| {
                let kind = if config.is_declared_categorical(&f.name) {
                    FeatureKind::Categorical
                } else {
                    f.kind()
                };
                (f.name.as_str(), kind)
            })
            .collect();
        config.validate_features(&kinds)?;

        if let Some(name) = config
            .features
            .keys()
            .find(|name| dataset.feature(name).is_none())
        {
            debug!(feature = %name, "override configured for a feature that is not in the dataset");
        }

        let (events, non_events) = validate_target(target, dataset.n_rows())?;
        info!(
            features = dataset.features().len(),
            rows = dataset.n_rows(),
            events,
            non_events,
            "fitting binning process"
        );

        let results = dataset
            .features()
            .par_iter()
            .map(|feature| match coerce_declared_categorical(feature, config) {
                Some(coerced) => fit_feature(&coerced, target, config),
                None => fit_feature(feature, target, config),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            format_version: FORMAT_VERSION,
            config: config.clone(),
            results,
        })
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    pub fn results(&self) -> &[BinningResult] {
        &self.results
    }

    pub fn result(&self, name: &str) -> Option<&BinningResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.name.as_str()).collect()
    }

    /// Feature values for a fitted result, or `MissingFeature`
    pub(crate) fn values_for<'d>(&self, dataset: &'d Dataset, name: &str) -> Result<&'d FeatureValues> {
        dataset
            .feature(name)
            .map(|f| &f.values)
            .ok_or_else(|| BinningError::MissingFeature(name.to_string()))
    }

    /// Map every fitted feature of `dataset` to the requested metric
    pub fn transform(&self, dataset: &Dataset, metric: Metric) -> Result<TransformedDataset> {
        self.transform_features(dataset, metric, None)
    }

    /// Like `transform`, restricted to the named features
    pub fn transform_features(
        &self,
        dataset: &Dataset,
        metric: Metric,
        features: Option<&[String]>,
    ) -> Result<TransformedDataset> {
        let selected: Vec<&BinningResult> = match features {
            Some(names) => names
                .iter()
                .map(|n| {
                    self.result(n)
                        .ok_or_else(|| BinningError::MissingFeature(n.clone()))
                })
                .collect::<Result<_>>()?,
            None => self.results.iter().collect(),
        };

        let inputs = selected
            .iter()
            .map(|r| Ok((*r, self.values_for(dataset, &r.name)?)))
            .collect::<Result<Vec<_>>>()?;

        let outputs: Vec<(TransformedColumn, TransformDiagnostics)> = inputs
            .par_iter()
            .map(|(result, values)| transform_feature(result, values, metric))
            .collect();

        let mut columns = Vec::with_capacity(outputs.len());
        let mut diagnostics = BTreeMap::new();
        for (column, diag) in outputs {
            if !diag.is_clean() {
                debug!(
                    feature = %column.name,
                    below_range = diag.below_range,
                    above_range = diag.above_range,
                    unseen_to_other = diag.unseen_to_other,
                    unseen_to_unknown = diag.unseen_to_unknown,
                    "values outside the fitted domain"
                );
            }
            diagnostics.insert(column.name.clone(), diag);
            columns.push(column);
        }

        Ok(TransformedDataset {
            metric,
            columns,
            diagnostics,
        })
    }

    /// Per-feature overview in fit order
    pub fn summary(&self) -> Vec<FeatureSummary> {
        self.results
            .iter()
            .map(|r| FeatureSummary {
                name: r.name.clone(),
                kind: r.kind,
                n_bins: r.n_value_bins,
                iv: r.total_iv,
                requested_trend: r.requested_trend,
                achieved_trend: r.achieved_trend,
                warnings: r.warnings.clone(),
            })
            .collect()
    }

    /// Features with `iv >= min_iv` and at least `min_n_bins` value bins
    pub fn select(&self, min_iv: f64, min_n_bins: usize) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| r.total_iv >= min_iv && r.n_value_bins >= min_n_bins)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Binning table of one feature, with a trailing totals row
    pub fn binning_table(&self, name: &str) -> Option<Vec<BinningTableRow>> {
        let result = self.result(name)?;
        let n: usize = result.bins.iter().map(|b| b.count).sum();
        let pct = |count: usize| if n > 0 { count as f64 / n as f64 } else { 0.0 };

        let mut rows: Vec<BinningTableRow> = result
            .bins
            .iter()
            .map(|b| BinningTableRow {
                bin: b.kind.label(),
                count: b.count,
                count_pct: pct(b.count),
                event_count: b.event_count,
                nonevent_count: b.nonevent_count,
                event_rate: b.event_rate,
                woe: b.woe,
                iv: b.iv_contribution,
            })
            .collect();

        let events: usize = result.bins.iter().map(|b| b.event_count).sum();
        rows.push(BinningTableRow {
            bin: "Totals".to_string(),
            count: n,
            count_pct: pct(n),
            event_count: events,
            nonevent_count: n - events,
            event_rate: pct(events),
            woe: 0.0,
            iv: result.total_iv,
        });
        Some(rows)
    }

    /// Serialize the artifact to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Deserialize an artifact, rejecting other format versions
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_format_version(bytes, FORMAT_VERSION)?;
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}
