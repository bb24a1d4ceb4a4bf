//! Pipeline module - binning, WoE encoding, scorecard scaling and monitoring

pub mod binning;
pub mod config;
pub mod dataset;
pub mod error;
pub mod estimator;
pub mod loader;
pub mod metrics;
pub mod process;
pub mod psi;
pub mod scorecard;

pub use binning::{
    AchievedTrend, Bin, BinKind, BinningResult, Counts, FeatureWarning, Metric,
    TransformDiagnostics, TransformedColumn, TransformedValues, ValueRange,
};
pub use config::{FeatureParams, FitConfig, MonotonicTrend};
pub use dataset::{Dataset, Feature, FeatureKind, FeatureValues};
pub use error::{BinningError, Result};
pub use estimator::{Estimator, LinearModel, LogisticRegression};
pub use metrics::{PerformanceMetrics, PopulationDistribution};
pub use process::{BinningProcess, BinningTableRow, FeatureSummary, TransformedDataset};
pub use psi::{compute_psi, compute_psi_for, compute_score_psi, psi_table, FeaturePsi, PsiLevel, PsiRow};
pub use scorecard::{PointsRow, ScalingParams, Scorecard};
