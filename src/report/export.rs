//! JSON reports for fit and monitoring runs

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{
    BinningProcess, BinningTableRow, FeaturePsi, FeatureSummary, PerformanceMetrics,
    PopulationDistribution, PsiLevel,
};

/// Metadata about the run
#[derive(Debug, Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub scorebin_version: String,
    pub input_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_column: Option<String>,
}

impl RunMetadata {
    pub fn new(input_file: &Path, target_column: Option<&str>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            scorebin_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: input_file.display().to_string(),
            target_column: target_column.map(str::to_string),
        }
    }
}

/// A feature's summary with its full binning table
#[derive(Debug, Serialize)]
pub struct FeatureReport {
    #[serde(flatten)]
    pub summary: FeatureSummary,
    pub selected: bool,
    pub bins: Vec<BinningTableRow>,
}

/// Report written after `scorebin fit`
#[derive(Debug, Serialize)]
pub struct FitReport {
    pub metadata: RunMetadata,
    pub population: PopulationDistribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceMetrics>,
    pub features: Vec<FeatureReport>,
}

impl FitReport {
    pub fn new(
        metadata: RunMetadata,
        process: &BinningProcess,
        selected: &[String],
        population: PopulationDistribution,
        performance: Option<PerformanceMetrics>,
    ) -> Self {
        let features = process
            .summary()
            .into_iter()
            .map(|summary| {
                let bins = process.binning_table(&summary.name).unwrap_or_default();
                FeatureReport {
                    selected: selected.contains(&summary.name),
                    summary,
                    bins,
                }
            })
            .collect();

        Self {
            metadata,
            population,
            performance,
            features,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PsiReportEntry {
    #[serde(flatten)]
    pub result: FeaturePsi,
    pub level: PsiLevel,
}

/// Report written after `scorebin psi`
#[derive(Debug, Serialize)]
pub struct PsiReport {
    pub metadata: RunMetadata,
    pub expected_file: String,
    pub features: Vec<PsiReportEntry>,
}

impl PsiReport {
    pub fn new(metadata: RunMetadata, expected_file: &Path, results: Vec<FeaturePsi>) -> Self {
        Self {
            metadata,
            expected_file: expected_file.display().to_string(),
            features: results
                .into_iter()
                .map(|result| PsiReportEntry {
                    level: PsiLevel::from_psi(result.psi),
                    result,
                })
                .collect(),
        }
    }
}

/// Write any report as pretty JSON
pub fn write_json_report<T: Serialize>(report: &T, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    Ok(())
}
