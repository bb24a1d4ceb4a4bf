//! Integration tests for scorecard fitting, scaling and persistence

mod common;

use common::{risk_sample, RiskSample, NO_BUREAU_RECORD};
use scorebin::pipeline::{
    BinningError, BinningProcess, FitConfig, LogisticRegression, Metric, PerformanceMetrics,
    ScalingParams, Scorecard, TransformedValues,
};

fn fitted(sample: &RiskSample, scaling: ScalingParams) -> (BinningProcess, Scorecard) {
    let config = FitConfig {
        special_codes: vec![NO_BUREAU_RECORD],
        ..Default::default()
    };
    let dataset = sample.dataset();
    let process = BinningProcess::fit(&dataset, &sample.target, &config).unwrap();
    let features = vec!["ExternalRiskEstimate".to_string(), "region".to_string()];
    let scorecard = Scorecard::fit(
        &process,
        &dataset,
        &sample.target,
        &LogisticRegression::default(),
        scaling,
        Some(&features),
    )
    .unwrap();
    (process, scorecard)
}

#[test]
fn test_score_is_base_plus_bin_points() {
    let sample = risk_sample(3000, 101);
    let (process, scorecard) = fitted(&sample, ScalingParams::default());
    let dataset = sample.dataset();
    let scores = scorecard.score(&dataset).unwrap();

    let table = scorecard.points_table();
    assert_eq!(table[0].feature, "(base)");
    assert_eq!(table[0].points, scorecard.base_points());

    let indices = process.transform(&dataset, Metric::Indices).unwrap();
    for (row, score) in scores.iter().enumerate().step_by(97) {
        let mut expected = scorecard.base_points();
        for feature in scorecard.features() {
            let TransformedValues::Indices(idx) = &indices.column(feature).unwrap().values else {
                panic!("expected indices");
            };
            let result = process.result(feature).unwrap();
            let label = result.slot_label(idx[row] as usize);
            let points = table
                .iter()
                .find(|r| r.feature == feature && r.bin == label)
                .unwrap()
                .points;
            expected += points;
        }
        assert!((score - expected).abs() < 1e-9);
        // Rounded contributions give whole-number scores
        assert_eq!(score.fract(), 0.0);
    }
}

#[test]
fn test_higher_woe_earns_more_points() {
    let sample = risk_sample(3000, 103);
    let (_, scorecard) = fitted(&sample, ScalingParams::default());

    assert!(scorecard.model().coefficients[0] < 0.0);

    let rows: Vec<_> = scorecard
        .points_table()
        .into_iter()
        .filter(|r| r.feature == "ExternalRiskEstimate")
        .collect();
    let best = rows.iter().max_by(|a, b| a.woe.total_cmp(&b.woe)).unwrap();
    let worst = rows.iter().min_by(|a, b| a.woe.total_cmp(&b.woe)).unwrap();
    assert!(best.points > worst.points);
}

#[test]
fn test_probability_round_trip_without_rounding() {
    let sample = risk_sample(3000, 107);
    let scaling = ScalingParams {
        rounding: false,
        ..Default::default()
    };
    let (_, scorecard) = fitted(&sample, scaling);
    let dataset = sample.dataset();

    let scores = scorecard.score(&dataset).unwrap();
    let probabilities = scorecard.predict_proba(&dataset).unwrap();
    for (score, p) in scores.iter().zip(&probabilities) {
        assert!((scorecard.proba_from_score(*score) - p).abs() < 1e-9);
    }
}

#[test]
fn test_reverse_mirrors_scores_around_offset() {
    let sample = risk_sample(2000, 109);
    let plain = ScalingParams {
        rounding: false,
        ..Default::default()
    };
    let reversed = ScalingParams {
        rounding: false,
        reverse: true,
        ..Default::default()
    };
    let (_, a) = fitted(&sample, plain.clone());
    let (_, b) = fitted(&sample, reversed);
    let dataset = sample.dataset();

    let offset = plain.offset();
    for (x, y) in a.score(&dataset).unwrap().iter().zip(b.score(&dataset).unwrap()) {
        assert!((x + y - 2.0 * offset).abs() < 1e-6);
    }
    // Probabilities do not depend on the orientation of the points
    assert_eq!(a.predict_proba(&dataset).unwrap(), b.predict_proba(&dataset).unwrap());
}

#[test]
fn test_scorecard_discriminates() {
    let sample = risk_sample(4000, 113);
    let (_, scorecard) = fitted(&sample, ScalingParams::default());
    let probabilities = scorecard.predict_proba(&sample.dataset()).unwrap();
    let metrics = PerformanceMetrics::compute(&sample.target, &probabilities).unwrap();
    assert!(metrics.auc > 0.65, "auc {}", metrics.auc);
    assert!((metrics.gini - (2.0 * metrics.auc - 1.0)).abs() < 1e-12);
    assert!(metrics.ks > 0.0 && metrics.ks <= 1.0);
}

#[test]
fn test_scorecard_round_trip() {
    let sample = risk_sample(2000, 127);
    let (_, scorecard) = fitted(&sample, ScalingParams::default());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scorecard.json");
    scorecard.save(&path).unwrap();
    let loaded = Scorecard::load(&path).unwrap();

    assert_eq!(loaded, scorecard);
    let dataset = sample.dataset();
    assert_eq!(loaded.score(&dataset).unwrap(), scorecard.score(&dataset).unwrap());
}

#[test]
fn test_incompatible_scorecard_version() {
    let sample = risk_sample(1000, 131);
    let (_, scorecard) = fitted(&sample, ScalingParams::default());

    let mut json: serde_json::Value = serde_json::from_slice(&scorecard.to_bytes().unwrap()).unwrap();
    json["format_version"] = serde_json::json!(99);
    let bytes = serde_json::to_vec(&json).unwrap();

    assert!(matches!(
        Scorecard::from_bytes(&bytes),
        Err(BinningError::IncompatibleArtifact { found: 99, expected: 1 })
    ));
}

#[test]
fn test_scorecard_missing_feature() {
    let sample = risk_sample(1000, 137);
    let dataset = sample.dataset();
    let config = FitConfig::default();
    let process = BinningProcess::fit(&dataset, &sample.target, &config).unwrap();
    let result = Scorecard::fit(
        &process,
        &dataset,
        &sample.target,
        &LogisticRegression::default(),
        ScalingParams::default(),
        Some(&["income".to_string()]),
    );
    assert!(matches!(result, Err(BinningError::MissingFeature(_))));
}
