//! Fit-once column transform.
//!
//! [`ColumnTransform::fit`] learns a mean per numeric column and a sorted
//! vocabulary per categorical column. The resulting [`FittedTransform`] is
//! immutable: `transform` takes `&self`, and the same artifact is persisted
//! at training time and reloaded verbatim for inference.
//!
//! Output layout is fixed at fit time: numeric columns in declared order,
//! then one indicator column `<column>_<category>` per fitted category. Values
//! outside the vocabulary (and missing values) encode as an all-zero block.

use crate::error::{ProcessingError, Result};
use crate::io::{StagedWrite, stage_bytes};
use crate::utils::{float_values, is_numeric_dtype, non_null_mean};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Version written into every persisted transform.
pub const FORMAT_VERSION: u32 = 1;

/// Which columns the transform treats as numeric and which as categorical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSpec {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self {
            numeric: [
                "sqft",
                "bedrooms",
                "bathrooms",
                "house_age",
                "price_per_sqft",
                "bed_bath_ratio",
            ]
            .map(String::from)
            .to_vec(),
            categorical: ["location", "condition"].map(String::from).to_vec(),
        }
    }
}

/// Unfitted column transform.
#[derive(Debug, Clone, Default)]
pub struct ColumnTransform {
    spec: TransformSpec,
}

impl ColumnTransform {
    pub fn new(spec: TransformSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &TransformSpec {
        &self.spec
    }

    /// Learn column statistics from `df`.
    pub fn fit(&self, df: &DataFrame) -> Result<FittedTransform> {
        let mut numeric = Vec::with_capacity(self.spec.numeric.len());
        for name in &self.spec.numeric {
            let series = numeric_input(df, name)?;
            let mean = non_null_mean(&series)?.unwrap_or(0.0);
            debug!("Fitted mean {:.4} for '{}'", mean, name);
            numeric.push(NumericColumn {
                name: name.clone(),
                mean,
            });
        }

        let mut categorical = Vec::with_capacity(self.spec.categorical.len());
        for name in &self.spec.categorical {
            let values = categorical_input(df, name)?;
            let categories: BTreeSet<String> = values.into_iter().flatten().collect();
            debug!("Fitted {} categories for '{}'", categories.len(), name);
            categorical.push(CategoricalColumn {
                name: name.clone(),
                categories: categories.into_iter().collect(),
            });
        }

        let fitted = FittedTransform {
            format_version: FORMAT_VERSION,
            numeric,
            categorical,
        };

        info!(
            "Fitted column transform on {} rows ({} output columns)",
            df.height(),
            fitted.output_width()
        );
        Ok(fitted)
    }

    /// Fit on `df` and return the fitted transform with the transformed matrix.
    pub fn fit_transform(&self, df: &DataFrame) -> Result<(FittedTransform, DataFrame)> {
        let fitted = self.fit(df)?;
        let matrix = fitted.transform(df)?;
        Ok((fitted, matrix))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NumericColumn {
    name: String,
    mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CategoricalColumn {
    name: String,
    categories: Vec<String>,
}

/// A fitted, immutable column transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    format_version: u32,
    numeric: Vec<NumericColumn>,
    categorical: Vec<CategoricalColumn>,
}

static_assertions::assert_impl_all!(FittedTransform: Send, Sync);

impl FittedTransform {
    /// Number of columns produced by [`transform`](Self::transform).
    pub fn output_width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.categories.len())
                .sum::<usize>()
    }

    /// Names of the output columns, in output order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|c| c.name.clone()).collect();
        for column in &self.categorical {
            names.extend(
                column
                    .categories
                    .iter()
                    .map(|category| format!("{}_{}", column.name, category)),
            );
        }
        names
    }

    /// Fitted mean of a numeric column.
    pub fn mean_of(&self, column: &str) -> Option<f64> {
        self.numeric.iter().find(|c| c.name == column).map(|c| c.mean)
    }

    /// Fitted vocabulary of a categorical column.
    pub fn categories_of(&self, column: &str) -> Option<&[String]> {
        self.categorical
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.categories.as_slice())
    }

    /// Apply the fitted statistics to `df`.
    ///
    /// Never refits. Extra input columns are ignored.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.output_width());

        for column in &self.numeric {
            let values: Vec<f64> = float_values(&numeric_input(df, &column.name)?)?
                .into_iter()
                .map(|v| match v {
                    Some(x) if !x.is_nan() => x,
                    _ => column.mean,
                })
                .collect();
            columns.push(Series::new(column.name.as_str().into(), values).into());
        }

        for column in &self.categorical {
            let values = categorical_input(df, &column.name)?;
            for category in &column.categories {
                let indicator: Vec<f64> = values
                    .iter()
                    .map(|v| if v.as_deref() == Some(category.as_str()) { 1.0 } else { 0.0 })
                    .collect();
                let name = format!("{}_{}", column.name, category);
                columns.push(Series::new(name.into(), indicator).into());
            }
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Persist as versioned JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.stage(path)?.commit()
    }

    /// Serialise next to `path` without replacing it yet.
    pub fn stage(&self, path: impl AsRef<Path>) -> Result<StagedWrite> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(self)?;
        let staged = stage_bytes(path, &json)?;
        info!("Staged column transform for {}", path.display());
        Ok(staged)
    }

    /// Load a transform persisted by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProcessingError::artifact_load(path, e))?;
        let fitted: Self =
            serde_json::from_str(&content).map_err(|e| ProcessingError::artifact_load(path, e))?;

        if fitted.format_version != FORMAT_VERSION {
            return Err(ProcessingError::artifact_load(
                path,
                format!(
                    "unsupported format version {} (expected {})",
                    fitted.format_version, FORMAT_VERSION
                ),
            ));
        }

        debug!("Loaded column transform from {}", path.display());
        Ok(fitted)
    }
}

fn input_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| ProcessingError::MissingFeature(name.to_string()))
}

fn numeric_input(df: &DataFrame, name: &str) -> Result<Series> {
    let column = input_column(df, name)?;
    if !is_numeric_dtype(column.dtype()) && column.dtype() != &DataType::Null {
        return Err(ProcessingError::NonNumericColumn(name.to_string()));
    }
    Ok(column.as_materialized_series().cast(&DataType::Float64)?)
}

fn categorical_input(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let as_str = input_column(df, name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(as_str
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}
