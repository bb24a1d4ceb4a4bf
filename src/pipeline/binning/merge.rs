//! Constrained greedy merging of adjacent prebins
//!
//! Three constraints are enforced in priority order and the sequence is
//! repeated until a full pass changes nothing:
//!
//! 1. strict monotonicity of the event rate (when a direction applies),
//! 2. minimum bin population with at least one event and one non-event,
//! 3. maximum number of bins, merging the pair that loses the least IV.
//!
//! Ties are always broken towards the leftmost pair, so the result is fully
//! determined by the prebin order and the parameters.

use std::ops::Range;

use super::woe::woe_iv;
use super::{AchievedTrend, Counts};
use crate::pipeline::config::MonotonicTrend;

/// Result of merging: prebin index ranges of the final value bins
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub groups: Vec<Range<usize>>,
    /// Direction enforced, if a monotonic trend was applied
    pub direction: Option<AchievedTrend>,
    pub merges: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn as_trend(self) -> AchievedTrend {
        match self {
            Direction::Ascending => AchievedTrend::Ascending,
            Direction::Descending => AchievedTrend::Descending,
        }
    }

    /// Size of the violation between two adjacent groups; `>= 0` violates
    /// the strict ordering
    fn violation(self, left: &Group, right: &Group) -> f64 {
        let (l, r) = (left.counts.event_rate(), right.counts.event_rate());
        match self {
            Direction::Ascending => l - r,
            Direction::Descending => r - l,
        }
    }
}

#[derive(Debug, Clone)]
struct Group {
    range: Range<usize>,
    counts: Counts,
}

/// Merge constraints shared by every pass
struct Limits {
    max_bins: usize,
    min_bin_count: usize,
    total: Counts,
}

/// Merge adjacent prebins until every constraint holds.
///
/// `min_bin_count` is the absolute minimum population per bin and `total`
/// the event/non-event totals of the whole feature, used for IV.
pub fn optimize(
    prebins: &[Counts],
    trend: MonotonicTrend,
    max_bins: usize,
    min_bin_count: usize,
    total: Counts,
) -> MergeOutcome {
    let initial: Vec<Group> = prebins
        .iter()
        .enumerate()
        .map(|(i, c)| Group {
            range: i..i + 1,
            counts: *c,
        })
        .collect();
    let limits = Limits {
        max_bins,
        min_bin_count,
        total,
    };

    let (groups, direction) = match trend {
        MonotonicTrend::Ascending => (
            run(initial, Some(Direction::Ascending), &limits),
            Some(Direction::Ascending),
        ),
        MonotonicTrend::Descending => (
            run(initial, Some(Direction::Descending), &limits),
            Some(Direction::Descending),
        ),
        MonotonicTrend::None => (run(initial, None, &limits), None),
        MonotonicTrend::Auto => {
            let ascending = run(initial.clone(), Some(Direction::Ascending), &limits);
            let descending = run(initial, Some(Direction::Descending), &limits);

            // Fewer merges means more surviving bins; then higher IV; then ascending
            let prefer_descending = descending.len() > ascending.len()
                || (descending.len() == ascending.len()
                    && total_iv(&descending, total) > total_iv(&ascending, total));
            if prefer_descending {
                (descending, Some(Direction::Descending))
            } else {
                (ascending, Some(Direction::Ascending))
            }
        }
    };

    MergeOutcome {
        merges: prebins.len() - groups.len(),
        groups: groups.into_iter().map(|g| g.range).collect(),
        direction: direction.map(Direction::as_trend),
    }
}

fn run(mut groups: Vec<Group>, direction: Option<Direction>, limits: &Limits) -> Vec<Group> {
    loop {
        let before = groups.len();
        if let Some(direction) = direction {
            enforce_monotonicity(&mut groups, direction);
        }
        enforce_min_size(&mut groups, direction, limits.min_bin_count);
        enforce_max_bins(&mut groups, limits.max_bins, limits.total);

        if groups.len() == before || groups.len() < 2 {
            return groups;
        }
    }
}

fn merge_at(groups: &mut Vec<Group>, idx: usize) {
    let right = groups.remove(idx + 1);
    let left = &mut groups[idx];
    left.range = left.range.start..right.range.end;
    left.counts = left.counts.merged(&right.counts);
}

fn group_iv(counts: &Counts, total: Counts) -> f64 {
    woe_iv(
        counts.events as f64,
        counts.non_events as f64,
        total.events as f64,
        total.non_events as f64,
    )
    .1
}

fn total_iv(groups: &[Group], total: Counts) -> f64 {
    groups.iter().map(|g| group_iv(&g.counts, total)).sum()
}

fn count_violations(groups: &[Group], direction: Option<Direction>) -> usize {
    match direction {
        Some(d) => groups
            .windows(2)
            .filter(|w| d.violation(&w[0], &w[1]) >= 0.0)
            .count(),
        None => 0,
    }
}

/// Repeatedly merge the adjacent pair with the largest violation
fn enforce_monotonicity(groups: &mut Vec<Group>, direction: Direction) {
    while groups.len() >= 2 {
        let mut worst: Option<(usize, f64)> = None;
        for i in 0..groups.len() - 1 {
            let v = direction.violation(&groups[i], &groups[i + 1]);
            if v >= 0.0 && worst.map_or(true, |(_, w)| v > w) {
                worst = Some((i, v));
            }
        }
        match worst {
            Some((i, _)) => merge_at(groups, i),
            None => break,
        }
    }
}

fn is_undersized(group: &Group, min_bin_count: usize) -> bool {
    group.counts.total() < min_bin_count || group.counts.events == 0 || group.counts.non_events == 0
}

/// Merge undersized groups, smallest first, into their best neighbour
fn enforce_min_size(groups: &mut Vec<Group>, direction: Option<Direction>, min_bin_count: usize) {
    while groups.len() >= 2 {
        let offender = groups
            .iter()
            .enumerate()
            .filter(|(_, g)| is_undersized(g, min_bin_count))
            .min_by_key(|(i, g)| (g.counts.total(), *i))
            .map(|(i, _)| i);
        let Some(i) = offender else {
            break;
        };

        let pair = if i == 0 {
            0
        } else if i + 1 == groups.len() {
            i - 1
        } else {
            choose_neighbour(groups, i, direction)
        };
        merge_at(groups, pair);
    }
}

/// Left index of the pair to merge for an offender with two neighbours
fn choose_neighbour(groups: &[Group], i: usize, direction: Option<Direction>) -> usize {
    let violations_after = |pair: usize| {
        let mut trial = groups.to_vec();
        merge_at(&mut trial, pair);
        count_violations(&trial, direction)
    };
    let rate = groups[i].counts.event_rate();
    let distance = |j: usize| (groups[j].counts.event_rate() - rate).abs();

    let (left, right) = (violations_after(i - 1), violations_after(i));
    if left != right {
        return if left < right { i - 1 } else { i };
    }
    if distance(i + 1) < distance(i - 1) {
        i
    } else {
        i - 1
    }
}

/// Merge the pair losing the least IV until at most `max_bins` remain
fn enforce_max_bins(groups: &mut Vec<Group>, max_bins: usize, total: Counts) {
    while groups.len() > max_bins.max(1) {
        let mut best: Option<(usize, f64)> = None;
        for i in 0..groups.len() - 1 {
            let merged = groups[i].counts.merged(&groups[i + 1].counts);
            let loss = group_iv(&groups[i].counts, total) + group_iv(&groups[i + 1].counts, total)
                - group_iv(&merged, total);
            if best.map_or(true, |(_, b)| loss < b) {
                best = Some((i, loss));
            }
        }
        match best {
            Some((i, _)) => merge_at(groups, i),
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(usize, usize)]) -> Vec<Counts> {
        pairs
            .iter()
            .map(|&(events, non_events)| Counts { events, non_events })
            .collect()
    }

    fn totals(prebins: &[Counts]) -> Counts {
        prebins.iter().fold(Counts::default(), |acc, c| acc.merged(c))
    }

    fn rates(prebins: &[Counts], outcome: &MergeOutcome) -> Vec<f64> {
        outcome
            .groups
            .iter()
            .map(|r| totals(&prebins[r.clone()]).event_rate())
            .collect()
    }

    #[test]
    fn test_ascending_merges_violations() {
        // Rates: 10%, 30%, 20%, 40%
        let prebins = counts(&[(10, 90), (30, 70), (20, 80), (40, 60)]);
        let outcome = optimize(&prebins, MonotonicTrend::Ascending, 10, 0, totals(&prebins));

        assert_eq!(outcome.groups, vec![0..1, 1..3, 3..4]);
        assert_eq!(outcome.direction, Some(AchievedTrend::Ascending));
        let r = rates(&prebins, &outcome);
        assert!(r.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_descending_equal_rates_merged() {
        let prebins = counts(&[(30, 70), (30, 70), (10, 90)]);
        let outcome = optimize(&prebins, MonotonicTrend::Descending, 10, 0, totals(&prebins));
        assert_eq!(outcome.groups, vec![0..2, 2..3]);
    }

    #[test]
    fn test_auto_picks_direction_with_fewer_merges() {
        let prebins = counts(&[(40, 60), (30, 70), (35, 65), (10, 90)]);
        let outcome = optimize(&prebins, MonotonicTrend::Auto, 10, 0, totals(&prebins));
        assert_eq!(outcome.direction, Some(AchievedTrend::Descending));
        assert_eq!(outcome.groups.len(), 3);
    }

    #[test]
    fn test_none_trend_keeps_non_monotonic_bins() {
        let prebins = counts(&[(10, 90), (30, 70), (20, 80)]);
        let outcome = optimize(&prebins, MonotonicTrend::None, 10, 0, totals(&prebins));
        assert_eq!(outcome.groups.len(), 3);
        assert_eq!(outcome.direction, None);
        assert_eq!(outcome.merges, 0);
    }

    #[test]
    fn test_min_size_merges_into_nearest_rate() {
        // Middle group is undersized; its rate is closer to the right neighbour
        let prebins = counts(&[(5, 95), (2, 3), (50, 50)]);
        let outcome = optimize(&prebins, MonotonicTrend::None, 10, 20, totals(&prebins));
        assert_eq!(outcome.groups, vec![0..1, 1..3]);
    }

    #[test]
    fn test_min_size_requires_both_classes() {
        let prebins = counts(&[(10, 90), (0, 100), (20, 80)]);
        let outcome = optimize(&prebins, MonotonicTrend::None, 10, 0, totals(&prebins));
        assert_eq!(outcome.groups.len(), 2);
    }

    #[test]
    fn test_max_bins_limits_count() {
        let prebins = counts(&[(5, 95), (10, 90), (15, 85), (20, 80), (25, 75), (30, 70)]);
        let outcome = optimize(&prebins, MonotonicTrend::Ascending, 3, 0, totals(&prebins));
        assert_eq!(outcome.groups.len(), 3);
        // Ranges still tile the prebins
        assert_eq!(outcome.groups.first().unwrap().start, 0);
        assert_eq!(outcome.groups.last().unwrap().end, 6);
        assert!(outcome.groups.windows(2).all(|w| w[0].end == w[1].start));
    }

    #[test]
    fn test_max_bins_tie_breaks_leftmost() {
        // Identical prebins: every merge loses the same IV
        let prebins = counts(&[(10, 90), (10, 90), (10, 90)]);
        let outcome = optimize(&prebins, MonotonicTrend::None, 2, 0, totals(&prebins));
        assert_eq!(outcome.groups, vec![0..2, 2..3]);
    }

    #[test]
    fn test_deterministic() {
        let prebins = counts(&[(12, 88), (9, 91), (30, 70), (25, 75), (40, 60), (8, 92)]);
        let a = optimize(&prebins, MonotonicTrend::Auto, 4, 50, totals(&prebins));
        let b = optimize(&prebins, MonotonicTrend::Auto, 4, 50, totals(&prebins));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_prebins() {
        let outcome = optimize(&[], MonotonicTrend::Auto, 5, 10, Counts::default());
        assert!(outcome.groups.is_empty());
        assert_eq!(outcome.merges, 0);
    }
}
