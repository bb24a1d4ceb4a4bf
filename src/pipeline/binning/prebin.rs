//! Prebinning: the fine-grained initial partition of the clean domain

use std::collections::BTreeMap;
use std::ops::Range;

use super::{BinKind, Counts};

/// A group of category labels forming one categorical prebin
#[derive(Debug, Clone, PartialEq)]
pub struct LabelGroup {
    pub labels: Vec<String>,
    /// True for the group of rare labels
    pub is_other: bool,
}

/// Initial partition of a feature's clean values
#[derive(Debug, Clone, PartialEq)]
pub enum Prebins {
    /// Ordered split points; prebin `i` covers `[splits[i-1], splits[i])`
    Numeric {
        splits: Vec<f64>,
        counts: Vec<Counts>,
        n_distinct: usize,
    },
    /// Ordered label groups
    Categorical {
        groups: Vec<LabelGroup>,
        counts: Vec<Counts>,
        n_distinct: usize,
    },
}

impl Prebins {
    pub fn counts(&self) -> &[Counts] {
        match self {
            Prebins::Numeric { counts, .. } | Prebins::Categorical { counts, .. } => counts,
        }
    }

    pub fn len(&self) -> usize {
        self.counts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts().is_empty()
    }

    /// Distinct clean values (or labels) seen while prebinning
    pub fn n_distinct(&self) -> usize {
        match self {
            Prebins::Numeric { n_distinct, .. } | Prebins::Categorical { n_distinct, .. } => {
                *n_distinct
            }
        }
    }

    pub fn splits(&self) -> &[f64] {
        match self {
            Prebins::Numeric { splits, .. } => splits,
            Prebins::Categorical { .. } => &[],
        }
    }

    /// Bin covering a contiguous range of prebins
    pub fn kind_for(&self, range: Range<usize>) -> BinKind {
        match self {
            Prebins::Numeric { splits, counts, .. } => BinKind::Numeric {
                lower: (range.start > 0).then(|| splits[range.start - 1]),
                upper: (range.end < counts.len()).then(|| splits[range.end - 1]),
            },
            Prebins::Categorical { groups, .. } => {
                let members = &groups[range];
                BinKind::Categorical {
                    labels: members.iter().flat_map(|g| g.labels.iter().cloned()).collect(),
                    includes_other: members.iter().any(|g| g.is_other),
                }
            }
        }
    }

    /// A single bin covering the whole clean domain
    pub fn catch_all(&self) -> BinKind {
        self.kind_for(0..self.len())
    }
}

/// Quantile prebinning of numeric values.
///
/// Cut points sit only between distinct values, at most `max_n_prebins`
/// prebins are produced, and no prebin holds fewer than
/// `ceil(min_prebin_size * N)` observations.
pub fn prebin_numeric(pairs: &[(f64, u8)], min_prebin_size: f64, max_n_prebins: usize) -> Prebins {
    let mut sorted: Vec<(f64, u8)> = pairs.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    // (value, counts) per distinct value
    let mut distinct: Vec<(f64, Counts)> = Vec::new();
    for &(value, target) in &sorted {
        match distinct.last_mut() {
            Some((last, counts)) if *last == value => counts.add(target),
            _ => {
                let mut counts = Counts::default();
                counts.add(target);
                distinct.push((value, counts));
            }
        }
    }

    let n = sorted.len();
    let n_distinct = distinct.len();
    if n_distinct < 2 {
        let counts = distinct.first().map(|(_, c)| vec![*c]).unwrap_or_default();
        return Prebins::Numeric {
            splits: Vec::new(),
            counts,
            n_distinct,
        };
    }

    let floor = ((min_prebin_size * n as f64).ceil() as usize).max(1);
    let step = n as f64 / max_n_prebins as f64;

    let mut splits = Vec::new();
    let mut counts: Vec<Counts> = Vec::new();
    let mut current = Counts::default();
    let mut cumulative = 0usize;

    for (i, (value, group)) in distinct.iter().enumerate() {
        current = current.merged(group);
        cumulative += group.total();

        let Some((next_value, _)) = distinct.get(i + 1) else {
            break;
        };
        let quantile_reached = cumulative as f64 >= (counts.len() + 1) as f64 * step;
        if quantile_reached && current.total() >= floor {
            splits.push(split_point(*value, *next_value));
            counts.push(current);
            current = Counts::default();
        }
    }

    // An undersized trailing prebin joins its predecessor
    if current.total() < floor {
        if let Some(last) = counts.pop() {
            splits.pop();
            current = last.merged(&current);
        }
    }
    counts.push(current);

    Prebins::Numeric {
        splits,
        counts,
        n_distinct,
    }
}

/// Split point between two adjacent distinct values, strictly above `left`
fn split_point(left: f64, right: f64) -> f64 {
    let mid = left + (right - left) / 2.0;
    if mid > left {
        mid
    } else {
        right
    }
}

/// Prebinning of categorical labels.
///
/// Every label is its own prebin except labels rarer than `cat_cutoff`, which
/// are pooled into one "other" prebin. Prebins follow `category_order` when
/// given (unlisted groups appended), otherwise ascending event rate.
pub fn prebin_categorical(
    pairs: &[(&str, u8)],
    cat_cutoff: f64,
    category_order: Option<&[String]>,
) -> Prebins {
    let mut by_label: BTreeMap<&str, Counts> = BTreeMap::new();
    for &(label, target) in pairs {
        by_label.entry(label).or_default().add(target);
    }

    let n = pairs.len() as f64;
    let n_distinct = by_label.len();

    let mut entries: Vec<(LabelGroup, Counts)> = Vec::new();
    let mut other = (
        LabelGroup {
            labels: Vec::new(),
            is_other: true,
        },
        Counts::default(),
    );

    for (label, counts) in by_label {
        if (counts.total() as f64) / n < cat_cutoff {
            other.0.labels.push(label.to_string());
            other.1 = other.1.merged(&counts);
        } else {
            entries.push((
                LabelGroup {
                    labels: vec![label.to_string()],
                    is_other: false,
                },
                counts,
            ));
        }
    }
    if !other.0.labels.is_empty() {
        entries.push(other);
    }

    let by_rate = |a: &(LabelGroup, Counts), b: &(LabelGroup, Counts)| {
        a.1.event_rate()
            .total_cmp(&b.1.event_rate())
            .then_with(|| a.0.labels.cmp(&b.0.labels))
    };

    let ordered = match category_order {
        Some(order) => {
            let position = |group: &LabelGroup| {
                if group.is_other {
                    None
                } else {
                    order.iter().position(|o| *o == group.labels[0])
                }
            };
            let (mut listed, mut rest): (Vec<_>, Vec<_>) =
                entries.into_iter().partition(|e| position(&e.0).is_some());
            listed.sort_by_key(|e| position(&e.0));
            rest.sort_by(by_rate);
            listed.extend(rest);
            listed
        }
        None => {
            entries.sort_by(by_rate);
            entries
        }
    };

    let (groups, counts) = ordered.into_iter().unzip();
    Prebins::Categorical {
        groups,
        counts,
        n_distinct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_pairs(n: usize) -> Vec<(f64, u8)> {
        (0..n).map(|i| (i as f64, u8::from(i % 3 == 0))).collect()
    }

    #[test]
    fn test_numeric_prebins_respect_max_count() {
        let prebins = prebin_numeric(&numeric_pairs(1000), 1e-4, 20);
        assert_eq!(prebins.len(), 20);
        assert_eq!(prebins.splits().len(), 19);
        let total: usize = prebins.counts().iter().map(|c| c.total()).sum();
        assert_eq!(total, 1000);
    }

    #[test]
    fn test_numeric_splits_between_distinct_values() {
        // Heavy ties: only three distinct values
        let mut pairs = vec![(1.0, 0); 50];
        pairs.extend(vec![(2.0, 1); 50]);
        pairs.extend(vec![(3.0, 0); 50]);
        let prebins = prebin_numeric(&pairs, 1e-4, 20);

        assert_eq!(prebins.splits(), &[1.5, 2.5]);
        assert_eq!(prebins.n_distinct(), 3);
        assert!(prebins.counts().iter().all(|c| c.total() == 50));
    }

    #[test]
    fn test_numeric_prebin_floor() {
        // A floor of 40% allows at most two prebins
        let prebins = prebin_numeric(&numeric_pairs(100), 0.4, 20);
        assert!(prebins.len() <= 2);
        assert!(prebins.counts().iter().all(|c| c.total() >= 40));
    }

    #[test]
    fn test_numeric_single_distinct_value() {
        let prebins = prebin_numeric(&[(5.0, 0), (5.0, 1)], 1e-4, 20);
        assert_eq!(prebins.len(), 1);
        assert!(prebins.splits().is_empty());
        assert_eq!(prebins.n_distinct(), 1);
    }

    #[test]
    fn test_split_point_guard() {
        assert_eq!(split_point(1.0, 2.0), 1.5);
        let left: f64 = 1.0;
        let right = f64::from_bits(left.to_bits() + 1);
        assert_eq!(split_point(left, right), right);
    }

    #[test]
    fn test_kind_for_ranges() {
        let prebins = Prebins::Numeric {
            splits: vec![1.5, 2.5],
            counts: vec![Counts::default(); 3],
            n_distinct: 3,
        };
        assert_eq!(
            prebins.kind_for(0..1),
            BinKind::Numeric { lower: None, upper: Some(1.5) }
        );
        assert_eq!(
            prebins.kind_for(1..3),
            BinKind::Numeric { lower: Some(1.5), upper: None }
        );
        assert_eq!(prebins.catch_all(), BinKind::Numeric { lower: None, upper: None });
    }

    #[test]
    fn test_categorical_rare_labels_grouped() {
        let mut pairs: Vec<(&str, u8)> = Vec::new();
        pairs.extend(std::iter::repeat(("A", 0)).take(45));
        pairs.extend(std::iter::repeat(("A", 1)).take(5));
        pairs.extend(std::iter::repeat(("B", 0)).take(30));
        pairs.extend(std::iter::repeat(("B", 1)).take(18));
        pairs.push(("X", 1));
        pairs.push(("Y", 0));

        let prebins = prebin_categorical(&pairs, 0.05, None);
        let Prebins::Categorical { groups, .. } = &prebins else {
            panic!("expected categorical prebins");
        };

        assert_eq!(groups.len(), 3);
        // Ascending event rate: A (10%), B (37.5%), other (50%)
        assert_eq!(groups[0].labels, vec!["A"]);
        assert_eq!(groups[1].labels, vec!["B"]);
        assert!(groups[2].is_other);
        assert_eq!(groups[2].labels, vec!["X", "Y"]);
        assert_eq!(prebins.n_distinct(), 4);
    }

    #[test]
    fn test_categorical_explicit_order() {
        let pairs = vec![("low", 0), ("high", 1), ("mid", 0), ("mid", 1), ("extra", 0)];
        let order = vec!["high".to_string(), "mid".to_string(), "low".to_string()];
        let prebins = prebin_categorical(&pairs, 0.0, Some(&order));
        let Prebins::Categorical { groups, .. } = &prebins else {
            panic!("expected categorical prebins");
        };

        let labels: Vec<&str> = groups.iter().map(|g| g.labels[0].as_str()).collect();
        assert_eq!(labels, vec!["high", "mid", "low", "extra"]);
    }
}
