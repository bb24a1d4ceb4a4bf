//! Error types for the binning engine.
//!
//! Fit fails only for configuration or input-shape problems. Degenerate
//! features, unseen categories and out-of-range values are not errors: they
//! surface as warnings on the fitted result or as transform diagnostics.

use thiserror::Error;

/// Errors raised by fitting, transforming and (de)serializing artifacts.
#[derive(Debug, Error)]
pub enum BinningError {
    /// Invalid fit parameters. Raised before any data is scanned.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Input data cannot be used for fitting (shape or target problems).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A fitted feature is absent from the dataset being transformed.
    #[error("feature '{0}' not found in dataset")]
    MissingFeature(String),

    /// The artifact bytes are corrupt or do not match the expected schema.
    #[error("failed to (de)serialize artifact: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The artifact was written by an incompatible format version.
    #[error("artifact format version {found} is not supported (expected {expected})")]
    IncompatibleArtifact { found: u32, expected: u32 },

    /// The estimator could not produce coefficients.
    #[error("estimator failed: {0}")]
    Estimator(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = BinningError> = std::result::Result<T, E>;
