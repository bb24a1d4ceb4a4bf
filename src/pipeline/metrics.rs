//! Discrimination metrics for scored populations

use serde::Serialize;

use super::error::{BinningError, Result};

/// Counts of a binary target
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopulationDistribution {
    pub observations: usize,
    pub events: usize,
    pub non_events: usize,
    pub default_rate: f64,
}

impl PopulationDistribution {
    pub fn from_target(target: &[u8]) -> Self {
        let events = target.iter().filter(|&&t| t == 1).count();
        let observations = target.len();
        Self {
            observations,
            events,
            non_events: observations - events,
            default_rate: if observations > 0 {
                events as f64 / observations as f64
            } else {
                0.0
            },
        }
    }
}

/// AUC, Gini and KS of a set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub auc: f64,
    pub gini: f64,
    pub ks: f64,
    /// Prediction threshold maximising Youden's index
    pub cutoff: f64,
}

impl PerformanceMetrics {
    /// `predictions` must increase with risk (e.g. event probabilities)
    pub fn compute(target: &[u8], predictions: &[f64]) -> Result<Self> {
        let auc = auc(target, predictions)?;
        Ok(Self {
            auc,
            gini: 2.0 * auc - 1.0,
            ks: ks(target, predictions)?,
            cutoff: youden_cutoff(target, predictions)?,
        })
    }
}

/// (prediction, target) pairs sorted by prediction, after validating inputs
fn sorted_pairs(target: &[u8], predictions: &[f64]) -> Result<Vec<(f64, u8)>> {
    if target.len() != predictions.len() {
        return Err(BinningError::InvalidInput(format!(
            "{} predictions for {} targets",
            predictions.len(),
            target.len()
        )));
    }
    if predictions.iter().any(|p| p.is_nan()) {
        return Err(BinningError::InvalidInput("predictions contain NaN".to_string()));
    }
    let events = target.iter().filter(|&&t| t == 1).count();
    if events == 0 || events == target.len() {
        return Err(BinningError::InvalidInput(
            "metrics need both events and non-events".to_string(),
        ));
    }

    let mut pairs: Vec<(f64, u8)> = predictions.iter().copied().zip(target.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(pairs)
}

/// Area under the ROC curve via the Mann-Whitney U statistic, ties averaged
pub fn auc(target: &[u8], predictions: &[f64]) -> Result<f64> {
    let pairs = sorted_pairs(target, predictions)?;

    let total_pos = pairs.iter().filter(|(_, t)| *t == 1).count() as f64;
    let total_neg = pairs.len() as f64 - total_pos;

    let n = pairs.len();
    let mut rank_sum_pos = 0.0;
    let mut i = 0;

    while i < n {
        let current_value = pairs[i].0;
        let mut j = i;

        // Find all ties with same value
        while j < n && pairs[j].0 == current_value {
            j += 1;
        }

        // Ranks i+1..=j share their average
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        let positives = pairs[i..j].iter().filter(|(_, t)| *t == 1).count() as f64;
        rank_sum_pos += avg_rank * positives;

        i = j;
    }

    let u = rank_sum_pos - total_pos * (total_pos + 1.0) / 2.0;
    Ok((u / (total_pos * total_neg)).clamp(0.0, 1.0))
}

/// Gini coefficient: `2 * AUC - 1`
pub fn gini(target: &[u8], predictions: &[f64]) -> Result<f64> {
    Ok(2.0 * auc(target, predictions)? - 1.0)
}

/// Kolmogorov-Smirnov statistic: the largest gap between the cumulative
/// event and non-event distributions over the prediction
pub fn ks(target: &[u8], predictions: &[f64]) -> Result<f64> {
    let pairs = sorted_pairs(target, predictions)?;
    let total_pos = pairs.iter().filter(|(_, t)| *t == 1).count() as f64;
    let total_neg = pairs.len() as f64 - total_pos;

    let (mut cum_pos, mut cum_neg) = (0.0, 0.0);
    let mut best: f64 = 0.0;
    for (i, &(value, t)) in pairs.iter().enumerate() {
        if t == 1 {
            cum_pos += 1.0;
        } else {
            cum_neg += 1.0;
        }
        // Evaluate only at the end of a tie group
        let group_end = pairs.get(i + 1).map_or(true, |next| next.0 != value);
        if group_end {
            best = best.max((cum_neg / total_neg - cum_pos / total_pos).abs());
        }
    }
    Ok(best)
}

/// Cut-off maximising Youden's index `tpr - fpr`, predicting an event when
/// `prediction >= cutoff`
pub fn youden_cutoff(target: &[u8], predictions: &[f64]) -> Result<f64> {
    let mut pairs = sorted_pairs(target, predictions)?;
    pairs.reverse();
    let total_pos = pairs.iter().filter(|(_, t)| *t == 1).count() as f64;
    let total_neg = pairs.len() as f64 - total_pos;

    let (mut tp, mut fp) = (0.0, 0.0);
    let mut best = (f64::NEG_INFINITY, pairs[0].0);
    for (i, &(value, t)) in pairs.iter().enumerate() {
        if t == 1 {
            tp += 1.0;
        } else {
            fp += 1.0;
        }
        let group_end = pairs.get(i + 1).map_or(true, |next| next.0 != value);
        if group_end {
            let youden = tp / total_pos - fp / total_neg;
            if youden > best.0 {
                best = (youden, value);
            }
        }
    }
    Ok(best.1)
}
