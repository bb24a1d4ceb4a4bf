//! scorebin: supervised binning and scorecard library
//!
//! Bins numeric and categorical features into monotonic risk buckets, encodes
//! them with Weight of Evidence, scales a logistic regression into scorecard
//! points and monitors drift with the Population Stability Index.
//!
//! ```no_run
//! use scorebin::pipeline::{BinningProcess, Dataset, Feature, FitConfig, Metric};
//!
//! # fn main() -> scorebin::pipeline::Result<()> {
//! let ages: Vec<Option<f64>> = (0..200).map(|i| Some(20.0 + (i % 50) as f64)).collect();
//! let target: Vec<u8> = (0..200).map(|i| u8::from(i % 50 < 10)).collect();
//! let dataset = Dataset::new(vec![Feature::numeric("age", ages)])?;
//!
//! let process = BinningProcess::fit(&dataset, &target, &FitConfig::default())?;
//! let woe = process.transform(&dataset, Metric::Woe)?;
//! # let _ = woe;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
