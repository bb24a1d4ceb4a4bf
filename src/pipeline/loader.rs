//! Dataset loader for CSV and Parquet files
//!
//! Polars is confined to this module: frames are converted into the engine's
//! `Dataset` on the way in and results are assembled into frames on the way
//! out.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;

use super::binning::TransformedValues;
use super::dataset::{Dataset, Feature};
use super::error::BinningError;
use super::process::TransformedDataset;
use super::psi::PsiRow;

/// Load a dataset from a file (CSV or Parquet based on extension)
pub fn load_dataset(path: &Path) -> Result<LazyFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_has_header(true)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    Ok(lf)
}

/// Load and materialise a dataset
pub fn read_frame(path: &Path) -> Result<DataFrame> {
    load_dataset(path)?
        .collect()
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn is_categorical_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    dtype.is_primitive_numeric() || matches!(dtype, DataType::Boolean)
}

/// Columns usable as features: numeric or string-like, minus the excluded ones
pub fn feature_columns(df: &DataFrame, exclude: &[&str]) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| {
            (is_numeric_dtype(col.dtype()) || is_categorical_dtype(col.dtype()))
                && !exclude.contains(&col.name().as_str())
        })
        .map(|col| col.name().to_string())
        .collect()
}

/// Convert one polars column into an engine feature.
///
/// String-like columns become categorical; numeric columns stay numeric even
/// when declared categorical (the binning process converts them so fit and
/// transform render the labels the same way).
fn column_to_feature(df: &DataFrame, name: &str) -> Result<Feature> {
    let col = df
        .column(name)
        .with_context(|| format!("Feature column '{}' not found", name))?;

    if is_categorical_dtype(col.dtype()) {
        let string_col = col.cast(&DataType::String)?;
        let values: Vec<Option<String>> = string_col
            .str()?
            .into_iter()
            .map(|v| v.map(String::from))
            .collect();
        Ok(Feature::categorical(name, values))
    } else if is_numeric_dtype(col.dtype()) {
        let float_col = col.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = float_col.f64()?.into_iter().collect();
        Ok(Feature::numeric(name, values))
    } else {
        anyhow::bail!(
            "Feature column '{}' has unsupported type {}",
            name,
            col.dtype()
        )
    }
}

/// Convert the named columns of a frame into a `Dataset`
pub fn frame_to_dataset(df: &DataFrame, columns: &[String]) -> Result<Dataset> {
    let features = columns
        .iter()
        .map(|name| column_to_feature(df, name))
        .collect::<Result<Vec<_>>>()?;
    Ok(Dataset::new(features)?)
}

/// Dataset holding exactly the features a fitted artifact needs
pub fn scoring_dataset(df: &DataFrame, features: &[&str]) -> Result<Dataset> {
    let names: Vec<String> = features.iter().map(|f| f.to_string()).collect();
    if let Some(missing) = names.iter().find(|n| df.column(n.as_str()).is_err()) {
        return Err(BinningError::MissingFeature(missing.clone()).into());
    }
    frame_to_dataset(df, &names)
}

/// Read a binary 0/1 target column; nulls stay `None`
pub fn extract_target(df: &DataFrame, target: &str) -> Result<Vec<Option<u8>>> {
    let target_col = df
        .column(target)
        .with_context(|| format!("Target column '{}' not found", target))?;

    if target_col.len() == 0 {
        anyhow::bail!("Target column '{}' is empty", target);
    }
    if target_col.null_count() == target_col.len() {
        anyhow::bail!("Target column '{}' contains only null values", target);
    }

    // Cast to Float64 first to handle both integer and float types uniformly
    let float_col = target_col
        .cast(&DataType::Float64)
        .with_context(|| format!("Target column '{}' is not numeric", target))?;

    const TOLERANCE: f64 = 1e-9;
    float_col
        .f64()?
        .into_iter()
        .map(|v| match v {
            None => Ok(None),
            Some(x) if x.abs() < TOLERANCE => Ok(Some(0)),
            Some(x) if (x - 1.0).abs() < TOLERANCE => Ok(Some(1)),
            Some(x) => anyhow::bail!(
                "Target column '{}' must be binary (0/1), found value {}",
                target,
                x
            ),
        })
        .collect()
}

/// Training data: features with the target, rows with a null target removed
pub struct TrainingData {
    pub dataset: Dataset,
    pub target: Vec<u8>,
    pub dropped_rows: usize,
}

/// Build training data from a frame.
///
/// Uses `features` when given, otherwise every usable column except the target.
pub fn training_data(
    df: &DataFrame,
    target: &str,
    features: Option<&[String]>,
) -> Result<TrainingData> {
    let columns: Vec<String> = match features {
        Some(names) => names.to_vec(),
        None => feature_columns(df, &[target]),
    };
    if columns.is_empty() {
        anyhow::bail!("No feature columns found besides target '{}'", target);
    }

    let raw_target = extract_target(df, target)?;
    let mut dataset = frame_to_dataset(df, &columns)?;

    let mask: Vec<bool> = raw_target.iter().map(Option::is_some).collect();
    let dropped_rows = mask.iter().filter(|keep| !**keep).count();
    if dropped_rows > 0 {
        dataset.filter_rows(&mask)?;
    }
    let target = raw_target.into_iter().flatten().collect();

    Ok(TrainingData {
        dataset,
        target,
        dropped_rows,
    })
}

/// Assemble transformed columns (plus passthrough columns) into a frame
pub fn transformed_to_frame(transformed: &TransformedDataset, passthrough: Vec<Column>) -> Result<DataFrame> {
    let mut columns = passthrough;
    for column in &transformed.columns {
        let name: PlSmallStr = column.name.as_str().into();
        let col = match &column.values {
            TransformedValues::Woe(v) => Column::new(name, v),
            TransformedValues::Bins(v) => Column::new(name, v),
            TransformedValues::Indices(v) => Column::new(name, v),
        };
        columns.push(col);
    }
    DataFrame::new(columns).context("Failed to build transformed DataFrame")
}

/// Frame with one score (and probability) per row, plus passthrough columns
pub fn scores_to_frame(scores: &[f64], probabilities: &[f64], passthrough: Vec<Column>) -> Result<DataFrame> {
    let mut columns = passthrough;
    columns.push(Column::new("score".into(), scores));
    columns.push(Column::new("probability".into(), probabilities));
    DataFrame::new(columns).context("Failed to build score DataFrame")
}

/// Frame with the flat PSI table
pub fn psi_rows_to_frame(rows: &[PsiRow]) -> Result<DataFrame> {
    let feature: Vec<&str> = rows.iter().map(|r| r.feature.as_str()).collect();
    let bin: Vec<&str> = rows.iter().map(|r| r.bin.as_str()).collect();
    let expected: Vec<f64> = rows.iter().map(|r| r.expected_pct).collect();
    let actual: Vec<f64> = rows.iter().map(|r| r.actual_pct).collect();
    let psi: Vec<f64> = rows.iter().map(|r| r.psi).collect();

    DataFrame::new(vec![
        Column::new("feature".into(), feature),
        Column::new("bin".into(), bin),
        Column::new("expected_pct".into(), expected),
        Column::new("actual_pct".into(), actual),
        Column::new("psi".into(), psi),
    ])
    .context("Failed to build PSI DataFrame")
}

/// Columns copied unchanged from the input into an output frame
pub fn passthrough_columns(df: &DataFrame, names: &[String]) -> Result<Vec<Column>> {
    names
        .iter()
        .map(|name| {
            df.column(name)
                .cloned()
                .with_context(|| format!("Column '{}' not found", name))
        })
        .collect()
}

/// Save dataset to file (CSV or Parquet based on extension)
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        _ => anyhow::bail!(
            "Unsupported output format: {}. Supported formats: csv, parquet",
            extension
        ),
    }

    Ok(())
}
