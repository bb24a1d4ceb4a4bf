//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::TempDir;

use scorebin::pipeline::{Dataset, Feature};

/// Missing-data sentinel used by the risk estimate fixture
pub const NO_BUREAU_RECORD: f64 = -9.0;

/// Raw columns of a synthetic bureau sample
///
/// - `ExternalRiskEstimate`: integer score 30-95, 5% coded `-9`; higher means
///   lower default risk
/// - `region`: one of four labels with different risk levels
/// - `noise`: uniform, unrelated to the target
/// - `target`: 0/1 default flag
pub struct RiskSample {
    pub risk_estimate: Vec<f64>,
    pub region: Vec<String>,
    pub noise: Vec<f64>,
    pub target: Vec<u8>,
}

pub fn risk_sample(rows: usize, seed: u64) -> RiskSample {
    let mut rng = StdRng::seed_from_u64(seed);
    let regions = ["north", "south", "east", "west"];
    let region_shift = [-0.4, 0.3, 0.0, 0.6];

    let mut sample = RiskSample {
        risk_estimate: Vec::with_capacity(rows),
        region: Vec::with_capacity(rows),
        noise: Vec::with_capacity(rows),
        target: Vec::with_capacity(rows),
    };

    for _ in 0..rows {
        let score = rng.gen_range(30..=95) as f64;
        let r = rng.gen_range(0..regions.len());
        let coded = rng.gen::<f64>() < 0.05;

        // Default odds fall as the estimate rises
        let log_odds = -1.5 - (score - 62.0) / 9.0 + region_shift[r] + if coded { 0.8 } else { 0.0 };
        let p = 1.0 / (1.0 + (-log_odds).exp());

        sample
            .risk_estimate
            .push(if coded { NO_BUREAU_RECORD } else { score });
        sample.region.push(regions[r].to_string());
        sample.noise.push(rng.gen::<f64>());
        sample.target.push(u8::from(rng.gen::<f64>() < p));
    }
    sample
}

impl RiskSample {
    pub fn dataset(&self) -> Dataset {
        Dataset::new(vec![
            Feature::numeric(
                "ExternalRiskEstimate",
                self.risk_estimate.iter().map(|&v| Some(v)).collect(),
            ),
            Feature::categorical("region", self.region.iter().map(|r| Some(r.clone())).collect()),
            Feature::numeric("noise", self.noise.iter().map(|&v| Some(v)).collect()),
        ])
        .unwrap()
    }

    pub fn dataframe(&self) -> DataFrame {
        let target: Vec<i32> = self.target.iter().map(|&t| i32::from(t)).collect();
        df! {
            "id" => (0..self.target.len() as i64).collect::<Vec<_>>(),
            "ExternalRiskEstimate" => &self.risk_estimate,
            "region" => &self.region,
            "noise" => &self.noise,
            "target" => target,
        }
        .unwrap()
    }
}

/// Categorical feature with A (1000 obs, 5% events), B (950 obs, 49 events)
/// and C (20 obs, 50% events)
pub fn abc_dataset() -> (Dataset, Vec<u8>) {
    let mut labels = Vec::new();
    let mut target = Vec::new();
    for (label, n, events) in [("A", 1000, 50), ("B", 950, 49), ("C", 20, 10)] {
        for i in 0..n {
            labels.push(Some(label.to_string()));
            target.push(u8::from(i < events));
        }
    }
    let dataset = Dataset::new(vec![Feature::categorical("grade", labels)]).unwrap();
    (dataset, target)
}

/// Two-valued numeric feature with the requested share of ones
pub fn binary_feature(name: &str, ones: usize, zeros: usize) -> Dataset {
    let values = (0..ones)
        .map(|_| Some(1.0))
        .chain((0..zeros).map(|_| Some(0.0)))
        .collect();
    Dataset::new(vec![Feature::numeric(name, values)]).unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}
