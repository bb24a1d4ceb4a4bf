//! In-memory feature columns consumed by the binning engine
//!
//! The engine never touches data frames directly: the loader converts each
//! column into a `FeatureValues` once, and every stage reads from there.

use serde::{Deserialize, Serialize};

use super::error::{BinningError, Result};

/// Kind of a feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKind::Numeric => write!(f, "numeric"),
            FeatureKind::Categorical => write!(f, "categorical"),
        }
    }
}

/// Values of one feature across all observations. `None` and `NaN` are missing.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl FeatureValues {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureValues::Numeric(_) => FeatureKind::Numeric,
            FeatureValues::Categorical(_) => FeatureKind::Categorical,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FeatureValues::Numeric(v) => v.len(),
            FeatureValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only the rows whose mask entry is true
    fn retain_rows(&mut self, mask: &[bool]) {
        match self {
            FeatureValues::Numeric(v) => retain_by_mask(v, mask),
            FeatureValues::Categorical(v) => retain_by_mask(v, mask),
        }
    }
}

fn retain_by_mask<T>(values: &mut Vec<T>, mask: &[bool]) {
    let mut keep = mask.iter();
    values.retain(|_| keep.next().copied().unwrap_or(false));
}

/// A named feature column
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub name: String,
    pub values: FeatureValues,
}

impl Feature {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values: FeatureValues::Numeric(values),
        }
    }

    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            values: FeatureValues::Categorical(values),
        }
    }

    pub fn kind(&self) -> FeatureKind {
        self.values.kind()
    }
}

/// A set of equally long feature columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    features: Vec<Feature>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset, checking that every column has the same length
    pub fn new(features: Vec<Feature>) -> Result<Self> {
        let n_rows = features.first().map(|f| f.values.len()).unwrap_or(0);
        if let Some(bad) = features.iter().find(|f| f.values.len() != n_rows) {
            return Err(BinningError::InvalidInput(format!(
                "feature '{}' has {} rows, expected {}",
                bad.name,
                bad.values.len(),
                n_rows
            )));
        }
        for (i, feature) in features.iter().enumerate() {
            if features[..i].iter().any(|f| f.name == feature.name) {
                return Err(BinningError::InvalidInput(format!(
                    "duplicate feature name '{}'",
                    feature.name
                )));
            }
        }
        Ok(Self { features, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// Drop rows whose mask entry is false
    pub fn filter_rows(&mut self, mask: &[bool]) -> Result<()> {
        if mask.len() != self.n_rows {
            return Err(BinningError::InvalidInput(format!(
                "row mask has {} entries, dataset has {} rows",
                mask.len(),
                self.n_rows
            )));
        }
        for feature in &mut self.features {
            feature.values.retain_rows(mask);
        }
        self.n_rows = mask.iter().filter(|&&keep| keep).count();
        Ok(())
    }
}

/// Validate a binary target against a dataset and return its event counts
pub fn validate_target(target: &[u8], n_rows: usize) -> Result<(usize, usize)> {
    if target.len() != n_rows {
        return Err(BinningError::InvalidInput(format!(
            "target has {} values, dataset has {} rows",
            target.len(),
            n_rows
        )));
    }
    if target.is_empty() {
        return Err(BinningError::InvalidInput("dataset is empty".to_string()));
    }
    if let Some(bad) = target.iter().find(|&&t| t > 1) {
        return Err(BinningError::InvalidInput(format!(
            "target must be binary (0/1), found {}",
            bad
        )));
    }

    let events = target.iter().filter(|&&t| t == 1).count();
    let non_events = target.len() - events;
    if events == 0 || non_events == 0 {
        return Err(BinningError::InvalidInput(
            "target has no variation (all 0s or all 1s)".to_string(),
        ));
    }
    Ok((events, non_events))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_rejects_ragged_columns() {
        let result = Dataset::new(vec![
            Feature::numeric("a", vec![Some(1.0), Some(2.0)]),
            Feature::numeric("b", vec![Some(1.0)]),
        ]);
        assert!(matches!(result, Err(BinningError::InvalidInput(_))));
    }

    #[test]
    fn test_dataset_rejects_duplicate_names() {
        let result = Dataset::new(vec![
            Feature::numeric("a", vec![Some(1.0)]),
            Feature::categorical("a", vec![Some("x".to_string())]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_rows() {
        let mut ds = Dataset::new(vec![
            Feature::numeric("a", vec![Some(1.0), None, Some(3.0)]),
            Feature::categorical("b", vec![Some("x".into()), Some("y".into()), None]),
        ])
        .unwrap();

        ds.filter_rows(&[true, false, true]).unwrap();
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(
            ds.feature("a").unwrap().values,
            FeatureValues::Numeric(vec![Some(1.0), Some(3.0)])
        );
        assert_eq!(
            ds.feature("b").unwrap().values,
            FeatureValues::Categorical(vec![Some("x".into()), None])
        );
    }

    #[test]
    fn test_validate_target() {
        assert_eq!(validate_target(&[0, 1, 1, 0], 4).unwrap(), (2, 2));
        assert!(validate_target(&[0, 1], 3).is_err());
        assert!(validate_target(&[0, 2], 2).is_err());
        assert!(validate_target(&[1, 1], 2).unwrap_err().to_string().contains("no variation"));
        assert!(validate_target(&[], 0).is_err());
    }
}
