//! Value-to-bin assignment shared by fitting, transforming and monitoring

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{BinKind, BinningResult, ValueRange};
use crate::pipeline::dataset::{FeatureKind, FeatureValues};

/// Output of `transform` for each value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Weight of Evidence of the bin
    #[default]
    Woe,
    /// Bin label
    Bins,
    /// Bin slot index; the unknown slot is the number of bins
    Indices,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Woe => write!(f, "woe"),
            Metric::Bins => write!(f, "bins"),
            Metric::Indices => write!(f, "indices"),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "woe" => Ok(Metric::Woe),
            "bins" | "bin" => Ok(Metric::Bins),
            "indices" | "index" => Ok(Metric::Indices),
            _ => Err(format!(
                "Unknown metric: '{}'. Use 'woe', 'bins' or 'indices'.",
                s
            )),
        }
    }
}

/// Where a single value landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// Regular bin (value bin, special bin or missing bin)
    Bin(usize),
    /// Below the fit-time minimum, clamped to the leftmost value bin
    BelowRange(usize),
    /// Above the fit-time maximum, clamped to the rightmost value bin
    AboveRange(usize),
    /// Unseen category absorbed by the bin holding the "other" group
    OtherGroup(usize),
    /// Unseen category with no "other" group
    Unknown,
}

impl Assignment {
    /// Slot index; `Unknown` maps to `n_bins`
    pub fn slot(self, n_bins: usize) -> usize {
        match self {
            Assignment::Bin(i)
            | Assignment::BelowRange(i)
            | Assignment::AboveRange(i)
            | Assignment::OtherGroup(i) => i,
            Assignment::Unknown => n_bins,
        }
    }
}

/// Counters for values that needed a fallback policy during transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformDiagnostics {
    pub below_range: usize,
    pub above_range: usize,
    pub unseen_to_other: usize,
    pub unseen_to_unknown: usize,
}

impl TransformDiagnostics {
    pub fn record(&mut self, assignment: Assignment) {
        match assignment {
            Assignment::BelowRange(_) => self.below_range += 1,
            Assignment::AboveRange(_) => self.above_range += 1,
            Assignment::OtherGroup(_) => self.unseen_to_other += 1,
            Assignment::Unknown => self.unseen_to_unknown += 1,
            Assignment::Bin(_) => {}
        }
    }

    pub fn out_of_range(&self) -> usize {
        self.below_range + self.above_range
    }

    pub fn unseen(&self) -> usize {
        self.unseen_to_other + self.unseen_to_unknown
    }

    pub fn is_clean(&self) -> bool {
        self.out_of_range() == 0 && self.unseen() == 0
    }
}

/// Maps raw values to bin slots for one fitted layout
#[derive(Debug, Clone)]
pub struct BinAssigner<'a> {
    kind: FeatureKind,
    splits: Vec<f64>,
    n_value_bins: usize,
    specials: Vec<(f64, usize)>,
    missing: Option<usize>,
    labels: HashMap<&'a str, usize>,
    other: Option<usize>,
    range: Option<ValueRange>,
    n_bins: usize,
}

impl<'a> BinAssigner<'a> {
    /// Build an assigner from a bin layout. With a `range`, numeric values
    /// outside it are reported as clamped.
    pub fn new(
        kind: FeatureKind,
        kinds: impl IntoIterator<Item = &'a BinKind>,
        range: Option<ValueRange>,
    ) -> Self {
        let mut assigner = Self {
            kind,
            splits: Vec::new(),
            n_value_bins: 0,
            specials: Vec::new(),
            missing: None,
            labels: HashMap::new(),
            other: None,
            range,
            n_bins: 0,
        };

        for (i, bin) in kinds.into_iter().enumerate() {
            assigner.n_bins += 1;
            match bin {
                BinKind::Numeric { upper, .. } => {
                    assigner.n_value_bins += 1;
                    if let Some(u) = upper {
                        assigner.splits.push(*u);
                    }
                }
                BinKind::Categorical {
                    labels,
                    includes_other,
                } => {
                    assigner.n_value_bins += 1;
                    for label in labels {
                        assigner.labels.insert(label.as_str(), i);
                    }
                    if *includes_other {
                        assigner.other = Some(i);
                    }
                }
                BinKind::Special { code } => assigner.specials.push((*code, i)),
                BinKind::Missing => assigner.missing = Some(i),
            }
        }

        assigner
    }

    fn missing(&self) -> Assignment {
        self.missing.map_or(Assignment::Unknown, Assignment::Bin)
    }

    fn special(&self, code: f64) -> Option<Assignment> {
        self.specials
            .iter()
            .find(|(c, _)| *c == code)
            .map(|&(_, i)| Assignment::Bin(i))
    }

    pub fn assign_numeric(&self, value: Option<f64>) -> Assignment {
        let x = match value {
            Some(x) if x.is_finite() => x,
            _ => return self.missing(),
        };
        if let Some(special) = self.special(x) {
            return special;
        }
        if self.kind == FeatureKind::Categorical {
            return self.lookup_label(&x.to_string());
        }
        if self.n_value_bins == 0 {
            return Assignment::Unknown;
        }

        let idx = self.splits.partition_point(|&s| s <= x);
        match self.range {
            Some(range) if x < range.min => Assignment::BelowRange(idx),
            Some(range) if x > range.max => Assignment::AboveRange(idx),
            _ => Assignment::Bin(idx),
        }
    }

    pub fn assign_label(&self, label: Option<&str>) -> Assignment {
        let Some(label) = label else {
            return self.missing();
        };
        if let Some(special) = label.trim().parse::<f64>().ok().and_then(|c| self.special(c)) {
            return special;
        }
        if self.kind == FeatureKind::Numeric {
            return match label.trim().parse::<f64>() {
                Ok(x) => self.assign_numeric(Some(x)),
                Err(_) => Assignment::Unknown,
            };
        }
        self.lookup_label(label)
    }

    fn lookup_label(&self, label: &str) -> Assignment {
        match (self.labels.get(label), self.other) {
            (Some(&i), _) => Assignment::Bin(i),
            (None, Some(other)) => Assignment::OtherGroup(other),
            (None, None) => Assignment::Unknown,
        }
    }

    pub fn assign_all(&self, values: &FeatureValues) -> Vec<Assignment> {
        match values {
            FeatureValues::Numeric(vals) => vals.iter().map(|v| self.assign_numeric(*v)).collect(),
            FeatureValues::Categorical(vals) => vals
                .iter()
                .map(|v| self.assign_label(v.as_deref()))
                .collect(),
        }
    }

    /// Slot index of an assignment under this layout
    pub fn slot(&self, assignment: Assignment) -> usize {
        assignment.slot(self.n_bins)
    }
}

/// Transformed values of one feature
#[derive(Debug, Clone, PartialEq)]
pub enum TransformedValues {
    Woe(Vec<f64>),
    Bins(Vec<String>),
    Indices(Vec<u32>),
}

impl TransformedValues {
    pub fn len(&self) -> usize {
        match self {
            TransformedValues::Woe(v) => v.len(),
            TransformedValues::Bins(v) => v.len(),
            TransformedValues::Indices(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformedColumn {
    pub name: String,
    pub values: TransformedValues,
}

/// Map every value of a feature through its fitted binning
pub fn transform_feature(
    result: &BinningResult,
    values: &FeatureValues,
    metric: Metric,
) -> (TransformedColumn, TransformDiagnostics) {
    let assigner = result.assigner();
    let assignments = assigner.assign_all(values);

    let mut diagnostics = TransformDiagnostics::default();
    for a in &assignments {
        diagnostics.record(*a);
    }

    let slots = assignments.iter().map(|a| assigner.slot(*a));
    let values = match metric {
        Metric::Woe => TransformedValues::Woe(slots.map(|s| result.slot_woe(s)).collect()),
        Metric::Bins => {
            let labels: Vec<String> = (0..result.n_slots()).map(|s| result.slot_label(s)).collect();
            TransformedValues::Bins(slots.map(|s| labels[s].clone()).collect())
        }
        Metric::Indices => TransformedValues::Indices(slots.map(|s| s as u32).collect()),
    };

    (
        TransformedColumn {
            name: result.name.clone(),
            values,
        },
        diagnostics,
    )
}
