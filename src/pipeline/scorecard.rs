//! Scorecard scaling: logistic coefficients to PDO/odds points
//!
//! The estimator models the event log-odds `s = intercept + sum(coef_i * woe_i)`.
//! Points are scaled on the good:bad log-odds `-s`:
//!
//! ```text
//! factor = pdo / ln(2)
//! offset = scorecard_points - factor * ln(odds)
//! score  = offset - factor * s
//! ```
//!
//! so each bin contributes `-factor * coef_i * woe` and the intercept
//! contributes `offset - factor * intercept`.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::binning::{Metric, TransformedValues};
use super::dataset::{validate_target, Dataset};
use super::error::{BinningError, Result};
use super::estimator::{sigmoid, Estimator, LinearModel};
use super::process::{check_format_version, BinningProcess, TransformedDataset};

/// Version of the serialized scorecard layout
pub const SCORECARD_FORMAT_VERSION: u32 = 1;

/// PDO/odds scaling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScalingParams {
    /// Points to double the odds
    pub pdo: f64,
    /// Good:bad odds at the reference score
    pub odds: f64,
    /// Score assigned to `odds`
    pub scorecard_points: f64,
    /// Round the base points and every bin's points before summing
    pub rounding: bool,
    /// Higher points mean higher risk
    pub reverse: bool,
}

impl Default for ScalingParams {
    fn default() -> Self {
        Self {
            pdo: 30.0,
            odds: 20.0,
            scorecard_points: 750.0,
            rounding: true,
            reverse: false,
        }
    }
}

impl ScalingParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.pdo.is_finite() && self.pdo > 0.0) {
            return Err(BinningError::Configuration(format!(
                "pdo must be a positive number, got {}",
                self.pdo
            )));
        }
        if !(self.odds.is_finite() && self.odds > 0.0) {
            return Err(BinningError::Configuration(format!(
                "odds must be a positive number, got {}",
                self.odds
            )));
        }
        if !self.scorecard_points.is_finite() {
            return Err(BinningError::Configuration(
                "scorecard_points must be finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn factor(&self) -> f64 {
        self.pdo / std::f64::consts::LN_2
    }

    pub fn offset(&self) -> f64 {
        self.scorecard_points - self.factor() * self.odds.ln()
    }

    /// -1 for the usual orientation, +1 when reversed
    fn sign(&self) -> f64 {
        if self.reverse {
            1.0
        } else {
            -1.0
        }
    }

    fn round(&self, points: f64) -> f64 {
        if self.rounding {
            points.round()
        } else {
            points
        }
    }
}

/// Points of every bin slot of one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePoints {
    pub feature: String,
    pub coefficient: f64,
    /// Indexed by bin slot; the last entry is the unknown slot
    pub points: Vec<f64>,
}

/// One row of `Scorecard::points_table`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointsRow {
    pub feature: String,
    pub bin: String,
    pub woe: f64,
    pub coefficient: f64,
    pub points: f64,
}

/// A fitted scorecard: binning, linear model and point scaling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    format_version: u32,
    process: BinningProcess,
    estimator: String,
    model: LinearModel,
    scaling: ScalingParams,
    base_points: f64,
    points: Vec<FeaturePoints>,
}

fn woe_columns(transformed: TransformedDataset) -> Vec<Vec<f64>> {
    transformed
        .columns
        .into_iter()
        .filter_map(|c| match c.values {
            TransformedValues::Woe(v) => Some(v),
            _ => None,
        })
        .collect()
}

impl Scorecard {
    /// Fit the estimator on WoE-encoded features and scale its coefficients.
    ///
    /// Uses every feature of `process` unless `features` names a subset.
    pub fn fit(
        process: &BinningProcess,
        dataset: &Dataset,
        target: &[u8],
        estimator: &dyn Estimator,
        scaling: ScalingParams,
        features: Option<&[String]>,
    ) -> Result<Self> {
        scaling.validate()?;
        validate_target(target, dataset.n_rows())?;

        let names: Vec<String> = match features {
            Some(names) => names.to_vec(),
            None => process.feature_names().into_iter().map(String::from).collect(),
        };
        if names.is_empty() {
            return Err(BinningError::Configuration(
                "scorecard needs at least one feature".to_string(),
            ));
        }

        let transformed = process.transform_features(dataset, Metric::Woe, Some(&names))?;
        let columns = woe_columns(transformed);
        let model = estimator.fit(&columns, target)?;

        let factor = scaling.factor();
        let sign = scaling.sign();
        let base_points = scaling.round(scaling.offset() + sign * factor * model.intercept);

        let points = names
            .iter()
            .zip(&model.coefficients)
            .map(|(name, &coefficient)| {
                let result = process
                    .result(name)
                    .ok_or_else(|| BinningError::MissingFeature(name.clone()))?;
                let points = (0..result.n_slots())
                    .map(|slot| scaling.round(sign * factor * coefficient * result.slot_woe(slot)))
                    .collect();
                Ok(FeaturePoints {
                    feature: name.clone(),
                    coefficient,
                    points,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            estimator = estimator.name(),
            features = names.len(),
            intercept = model.intercept,
            "fitted scorecard"
        );

        Ok(Self {
            format_version: SCORECARD_FORMAT_VERSION,
            process: process.clone(),
            estimator: estimator.name().to_string(),
            model,
            scaling,
            base_points,
            points,
        })
    }

    pub fn process(&self) -> &BinningProcess {
        &self.process
    }

    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    pub fn scaling(&self) -> &ScalingParams {
        &self.scaling
    }

    pub fn base_points(&self) -> f64 {
        self.base_points
    }

    pub fn features(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.feature.as_str()).collect()
    }

    /// Bin slot of every row, one vector per scorecard feature
    fn slots(&self, dataset: &Dataset) -> Result<Vec<Vec<usize>>> {
        self.points
            .par_iter()
            .map(|fp| {
                let result = self
                    .process
                    .result(&fp.feature)
                    .ok_or_else(|| BinningError::MissingFeature(fp.feature.clone()))?;
                let values = self.process.values_for(dataset, &fp.feature)?;
                let assigner = result.assigner();
                Ok(assigner
                    .assign_all(values)
                    .into_iter()
                    .map(|a| assigner.slot(a))
                    .collect())
            })
            .collect()
    }

    /// Event log-odds `intercept + sum(coef_i * woe_i)` per row
    pub fn decision_function(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        let slots = self.slots(dataset)?;
        let mut s = vec![self.model.intercept; dataset.n_rows()];
        for (fp, feature_slots) in self.points.iter().zip(&slots) {
            let result = self
                .process
                .result(&fp.feature)
                .ok_or_else(|| BinningError::MissingFeature(fp.feature.clone()))?;
            for (acc, &slot) in s.iter_mut().zip(feature_slots) {
                *acc += fp.coefficient * result.slot_woe(slot);
            }
        }
        Ok(s)
    }

    /// Scaled score per row: base points plus each feature's bin points
    pub fn score(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        let slots = self.slots(dataset)?;
        let mut scores = vec![self.base_points; dataset.n_rows()];
        for (fp, feature_slots) in self.points.iter().zip(&slots) {
            for (acc, &slot) in scores.iter_mut().zip(feature_slots) {
                *acc += fp.points[slot];
            }
        }
        Ok(scores)
    }

    /// Event probability per row, computed from the unrounded log-odds
    pub fn predict_proba(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        Ok(self
            .decision_function(dataset)?
            .into_iter()
            .map(sigmoid)
            .collect())
    }

    /// Invert the points formula: event probability implied by a score
    pub fn proba_from_score(&self, score: f64) -> f64 {
        let s = self.scaling.sign() * (score - self.scaling.offset()) / self.scaling.factor();
        sigmoid(s)
    }

    /// Points of every bin of every feature, in scorecard order
    pub fn points_table(&self) -> Vec<PointsRow> {
        let mut rows = vec![PointsRow {
            feature: "(base)".to_string(),
            bin: String::new(),
            woe: 0.0,
            coefficient: self.model.intercept,
            points: self.base_points,
        }];
        for fp in &self.points {
            let Some(result) = self.process.result(&fp.feature) else {
                continue;
            };
            rows.extend(fp.points.iter().enumerate().map(|(slot, &points)| PointsRow {
                feature: fp.feature.clone(),
                bin: result.slot_label(slot),
                woe: result.slot_woe(slot),
                coefficient: fp.coefficient,
                points,
            }));
        }
        rows
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        check_format_version(bytes, SCORECARD_FORMAT_VERSION)?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scaling() {
        let scaling = ScalingParams::default();
        assert!((scaling.factor() - 30.0 / 2f64.ln()).abs() < 1e-12);
        // 20:1 good:bad odds scores 750 points
        let expected = 750.0 - scaling.factor() * 20f64.ln();
        assert!((scaling.offset() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_scaling_validation() {
        let bad = ScalingParams {
            pdo: 0.0,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(BinningError::Configuration(_))));
        let bad = ScalingParams {
            odds: -1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        assert!(ScalingParams::default().validate().is_ok());
    }

    #[test]
    fn test_rounding_toggle() {
        let rounded = ScalingParams::default();
        assert_eq!(rounded.round(12.6), 13.0);
        let exact = ScalingParams {
            rounding: false,
            ..Default::default()
        };
        assert_eq!(exact.round(12.6), 12.6);
    }
}
