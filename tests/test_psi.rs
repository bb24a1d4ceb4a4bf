//! Integration tests for population stability monitoring

mod common;

use common::{binary_feature, risk_sample, NO_BUREAU_RECORD};
use scorebin::pipeline::{
    compute_psi, compute_score_psi, psi_table, BinningProcess, FitConfig, LogisticRegression,
    PsiLevel, ScalingParams, Scorecard,
};

fn fitted_process(seed: u64) -> (BinningProcess, common::RiskSample) {
    let sample = risk_sample(3000, seed);
    let config = FitConfig {
        special_codes: vec![NO_BUREAU_RECORD],
        ..Default::default()
    };
    let process = BinningProcess::fit(&sample.dataset(), &sample.target, &config).unwrap();
    (process, sample)
}

#[test]
fn test_identical_datasets_have_zero_psi() {
    let (process, sample) = fitted_process(201);
    let dataset = sample.dataset();

    let results = compute_psi(&process, &dataset, &dataset).unwrap();
    assert_eq!(results.len(), process.results().len());
    for result in &results {
        assert!(result.psi.abs() < 1e-12, "{} has psi {}", result.feature, result.psi);
        assert!(result.bins.iter().all(|b| b.psi.abs() < 1e-12));
    }
}

#[test]
fn test_two_bin_shift() {
    // Target tied to the value so the two values land in separate bins
    let training = binary_feature("flag", 500, 500);
    let target: Vec<u8> = (0..1000).map(|i| u8::from(if i < 500 { i % 4 == 0 } else { i % 10 == 0 })).collect();
    let process = BinningProcess::fit(&training, &target, &FitConfig::default()).unwrap();
    assert_eq!(process.result("flag").unwrap().n_value_bins, 2);

    let actual = binary_feature("flag", 400, 600);
    let results = compute_psi(&process, &training, &actual).unwrap();
    let flag = &results[0];

    // Missing and unknown slots are empty on both sides and skipped
    assert_eq!(flag.bins.len(), 2);
    let expected = 0.1 * (0.6f64 / 0.5).ln() + (-0.1) * (0.4f64 / 0.5).ln();
    assert!((flag.psi - expected).abs() < 1e-12);
    assert!((flag.psi - 0.0202).abs() < 1e-4);
    assert_eq!(PsiLevel::from_psi(flag.psi), PsiLevel::Stable);
}

#[test]
fn test_drifted_population_is_flagged() {
    let (process, sample) = fitted_process(203);
    let expected = sample.dataset();

    // Same generator, but every estimate shifted down by 20 points
    let mut drifted = risk_sample(3000, 204);
    for v in drifted.risk_estimate.iter_mut() {
        if *v != NO_BUREAU_RECORD {
            *v -= 20.0;
        }
    }
    let results = compute_psi(&process, &expected, &drifted.dataset()).unwrap();
    let ere = results
        .iter()
        .find(|r| r.feature == "ExternalRiskEstimate")
        .unwrap();
    assert_eq!(PsiLevel::from_psi(ere.psi), PsiLevel::Significant);

    let noise = results.iter().find(|r| r.feature == "noise").unwrap();
    assert!(noise.psi < 0.1);
}

#[test]
fn test_psi_table_rows_follow_features() {
    let (process, sample) = fitted_process(207);
    let other = risk_sample(2000, 208);
    let results = compute_psi(&process, &sample.dataset(), &other.dataset()).unwrap();

    let rows = psi_table(&results);
    let expected_rows: usize = results.iter().map(|r| r.bins.len()).sum();
    assert_eq!(rows.len(), expected_rows);
    assert_eq!(rows[0].feature, results[0].feature);

    for result in &results {
        let total: f64 = rows
            .iter()
            .filter(|r| r.feature == result.feature)
            .map(|r| r.psi)
            .sum();
        assert!((total - result.psi).abs() < 1e-12);
        assert!(result.psi >= 0.0);
    }
}

#[test]
fn test_score_psi() {
    let (process, sample) = fitted_process(211);
    let dataset = sample.dataset();
    let scorecard = Scorecard::fit(
        &process,
        &dataset,
        &sample.target,
        &LogisticRegression::default(),
        ScalingParams::default(),
        None,
    )
    .unwrap();

    let same = compute_score_psi(&scorecard, &dataset, &dataset, 10).unwrap();
    assert_eq!(same.feature, "score");
    assert!(same.psi.abs() < 1e-12);
    assert!(same.bins.len() <= 10);

    let other = risk_sample(3000, 212).dataset();
    let shifted = compute_score_psi(&scorecard, &dataset, &other, 10).unwrap();
    assert!(shifted.psi >= 0.0);
    assert!(shifted.psi < 0.1);

    assert!(compute_score_psi(&scorecard, &dataset, &other, 1).is_err());
}
