//! Tests for the CSV/Parquet boundary

mod common;

use polars::prelude::*;

use common::{create_temp_csv, create_temp_parquet, risk_sample};
use scorebin::pipeline::loader::{
    extract_target, feature_columns, load_dataset, passthrough_columns, psi_rows_to_frame,
    read_frame, save_dataset, scoring_dataset, training_data, transformed_to_frame,
};
use scorebin::pipeline::{
    psi_table, BinningError, BinningProcess, FeatureKind, FitConfig, Metric,
};

#[test]
fn test_load_csv_and_parquet() {
    let sample = risk_sample(200, 1);
    let mut df = sample.dataframe();

    let (_dir, csv) = create_temp_csv(&mut df);
    let from_csv = read_frame(&csv).unwrap();
    assert_eq!(from_csv.height(), 200);
    assert_eq!(from_csv.width(), 5);

    let (_dir2, parquet) = create_temp_parquet(&mut df);
    let from_parquet = load_dataset(&parquet).unwrap().collect().unwrap();
    assert_eq!(from_parquet.shape(), (200, 5));
}

#[test]
fn test_unsupported_extension() {
    let result = load_dataset(std::path::Path::new("data.xlsx"));
    assert!(result.is_err());
    assert!(result.err().unwrap().to_string().contains("Unsupported file format"));
}

#[test]
fn test_feature_kinds_follow_dtypes() {
    let df = risk_sample(100, 2).dataframe();
    let columns = feature_columns(&df, &["target", "id"]);
    assert_eq!(columns, vec!["ExternalRiskEstimate", "region", "noise"]);

    let data = training_data(&df, "target", Some(&columns)).unwrap();
    let dataset = &data.dataset;
    assert_eq!(dataset.feature("ExternalRiskEstimate").unwrap().kind(), FeatureKind::Numeric);
    assert_eq!(dataset.feature("region").unwrap().kind(), FeatureKind::Categorical);
    assert_eq!(data.target.len(), 100);
    assert_eq!(data.dropped_rows, 0);
}

#[test]
fn test_rows_with_null_target_are_dropped() {
    let df = df! {
        "x" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
        "target" => [Some(0i32), None, Some(1), Some(0), None],
    }
    .unwrap();
    let data = training_data(&df, "target", None).unwrap();
    assert_eq!(data.dropped_rows, 2);
    assert_eq!(data.target, vec![0, 1, 0]);
    assert_eq!(data.dataset.n_rows(), 3);
}

#[test]
fn test_target_must_be_binary() {
    let df = df! {
        "x" => [1.0f64, 2.0, 3.0],
        "target" => [0i32, 1, 2],
    }
    .unwrap();
    let err = extract_target(&df, "target").unwrap_err();
    assert!(err.to_string().contains("must be binary"));

    let floats = df! { "target" => [0.0f64, 1.0, 1.0] }.unwrap();
    assert_eq!(
        extract_target(&floats, "target").unwrap(),
        vec![Some(0), Some(1), Some(1)]
    );

    assert!(extract_target(&floats, "default").is_err());
}

#[test]
fn test_scoring_dataset_reports_missing_feature() {
    let df = df! { "x" => [1.0f64, 2.0] }.unwrap();
    let err = scoring_dataset(&df, &["x", "y"]).unwrap_err();
    let binning = err.downcast_ref::<BinningError>().unwrap();
    assert!(matches!(binning, BinningError::MissingFeature(name) if name == "y"));
}

#[test]
fn test_transformed_frame_written_to_disk() {
    let sample = risk_sample(500, 3);
    let df = sample.dataframe();
    let process = BinningProcess::fit(&sample.dataset(), &sample.target, &FitConfig::default()).unwrap();

    let transformed = process.transform(&sample.dataset(), Metric::Bins).unwrap();
    let passthrough = passthrough_columns(&df, &["id".to_string()]).unwrap();
    let mut frame = transformed_to_frame(&transformed, passthrough).unwrap();
    assert_eq!(frame.shape(), (500, 4));
    assert_eq!(frame.column("region").unwrap().dtype(), &DataType::String);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bins.parquet");
    save_dataset(&mut frame, &path).unwrap();
    let back = read_frame(&path).unwrap();
    assert_eq!(back.shape(), (500, 4));
    assert_eq!(back.get_column_names()[0].as_str(), "id");
}

#[test]
fn test_psi_frame_columns() {
    let sample = risk_sample(500, 4);
    let dataset = sample.dataset();
    let process = BinningProcess::fit(&dataset, &sample.target, &FitConfig::default()).unwrap();
    let results = scorebin::pipeline::compute_psi(&process, &dataset, &dataset).unwrap();

    let frame = psi_rows_to_frame(&psi_table(&results)).unwrap();
    let names: Vec<&str> = frame.get_column_names().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["feature", "bin", "expected_pct", "actual_pct", "psi"]);
}

#[test]
fn test_save_rejects_unknown_extension() {
    let mut df = df! { "x" => [1.0f64] }.unwrap();
    let dir = tempfile::tempdir().unwrap();
    assert!(save_dataset(&mut df, &dir.path().join("out.txt")).is_err());
}
