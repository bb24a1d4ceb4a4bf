//! Weight of Evidence and Information Value

use super::transform::Assignment;
use super::{Bin, BinKind, Counts};

/// Added to both the event and non-event count of a non-empty bin that lacks
/// one of the two classes, keeping the log ratio finite
pub const WOE_SMOOTHING: f64 = 0.5;

/// Calculate WoE and IV contribution for a bin
///
/// Uses the ln(%good/%bad) convention where:
/// - WoE > 0 indicates lower risk (relatively more non-events)
/// - WoE < 0 indicates higher risk (relatively more events)
///
/// Empty bins get WoE = 0 and IV = 0. Totals are never smoothed.
pub fn woe_iv(events: f64, non_events: f64, total_events: f64, total_non_events: f64) -> (f64, f64) {
    if events + non_events <= 0.0 || total_events <= 0.0 || total_non_events <= 0.0 {
        return (0.0, 0.0);
    }

    let (events, non_events) = if events == 0.0 || non_events == 0.0 {
        (events + WOE_SMOOTHING, non_events + WOE_SMOOTHING)
    } else {
        (events, non_events)
    };

    let dist_events = events / total_events;
    let dist_non_events = non_events / total_non_events;

    let woe = (dist_non_events / dist_events).ln();
    let iv_contrib = (dist_non_events - dist_events) * woe;

    (woe, iv_contrib)
}

/// Annotate a bin layout with counts, WoE and IV.
///
/// `slots` must come from the same assignment `transform` performs, so the
/// training statistics and a later `transform` agree bin for bin.
pub fn compute_stats(kinds: &[BinKind], slots: &[Assignment], target: &[u8], total: Counts) -> (Vec<Bin>, f64) {
    let mut counts = vec![Counts::default(); kinds.len()];
    for (assignment, &t) in slots.iter().zip(target) {
        if let Some(c) = counts.get_mut(assignment.slot(kinds.len())) {
            c.add(t);
        }
    }

    let bins: Vec<Bin> = kinds
        .iter()
        .zip(&counts)
        .map(|(kind, c)| {
            let (woe, iv_contribution) = woe_iv(
                c.events as f64,
                c.non_events as f64,
                total.events as f64,
                total.non_events as f64,
            );
            Bin {
                kind: kind.clone(),
                count: c.total(),
                event_count: c.events,
                nonevent_count: c.non_events,
                event_rate: c.event_rate(),
                woe,
                iv_contribution,
            }
        })
        .collect();

    let total_iv = bins.iter().map(|b| b.iv_contribution).sum();
    (bins, total_iv)
}
