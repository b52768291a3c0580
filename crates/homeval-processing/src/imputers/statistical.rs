//! Statistical imputation methods.
//!
//! Median for numeric columns, mode for categorical columns, with a fixed
//! sentinel for categorical columns that have no observed value at all.

use crate::error::Result;
use crate::utils::{
    column_names, fill_numeric_nulls, fill_string_nulls, is_numeric_dtype, missing_count,
    quantile_linear, sorted_non_null, string_mode,
};
use polars::prelude::*;
use tracing::{info, warn};

/// Label used for categorical columns with no observed value.
pub const MISSING_SENTINEL: &str = "UNKNOWN";

/// Fill value for a numeric column with no observed value.
const EMPTY_NUMERIC_FILL: f64 = 0.0;

/// Fill missing values in a DataFrame.
///
/// - Numeric columns are imputed with their median.
/// - Categorical columns are imputed with their mode, or [`MISSING_SENTINEL`]
///   when the column has no mode.
///
/// Columns without missing values are left untouched. The input is never
/// modified; a new DataFrame is returned.
pub fn fill_missing(df: &DataFrame) -> Result<DataFrame> {
    let mut out = df.clone();
    let mut steps = Vec::new();
    StatisticalImputer::impute_all(&mut out, &mut steps)?;
    Ok(out)
}

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Impute every column of `df` that has missing values.
    ///
    /// Columns are independent, so processing order does not affect the
    /// result. A description of each fill is appended to `processing_steps`.
    pub fn impute_all(df: &mut DataFrame, processing_steps: &mut Vec<String>) -> Result<()> {
        for col_name in column_names(df) {
            let (missing, numeric) = {
                let series = df.column(&col_name)?.as_materialized_series();
                (missing_count(series)?, is_numeric_dtype(series.dtype()))
            };

            if missing == 0 {
                continue;
            }

            if numeric {
                Self::apply_numeric_median(df, &col_name, missing, processing_steps)?;
            } else {
                Self::apply_mode_imputation(df, &col_name, missing, processing_steps)?;
            }
        }

        Ok(())
    }

    /// Apply median imputation for a numeric column.
    ///
    /// NaN cells count as missing and are excluded from the median. A column with no observed values has no median; it is filled with
    /// `0.0` and a warning is logged.
    pub fn apply_numeric_median(
        df: &mut DataFrame,
        col_name: &str,
        missing: usize,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let series = df.column(col_name)?.as_materialized_series().clone();

        let (fill_value, method) = match quantile_linear(&sorted_non_null(&series)?, 0.5) {
            Some(median) => (median, "median"),
            None => {
                warn!(
                    "Column '{}' has no observed values; filling with {}",
                    col_name, EMPTY_NUMERIC_FILL
                );
                (EMPTY_NUMERIC_FILL, "constant")
            }
        };

        let filled = fill_numeric_nulls(&series, fill_value)?;
        df.replace(col_name, filled)?;

        info!("Filled {} NA in {} with {}={}", missing, col_name, method, fill_value);
        processing_steps.push(format!(
            "Filled {} missing values in '{}' with {}: {:.2}",
            missing, col_name, method, fill_value
        ));

        Ok(())
    }

    /// Apply mode imputation for a categorical column.
    ///
    /// Falls back to [`MISSING_SENTINEL`] when the column is entirely missing.
    pub fn apply_mode_imputation(
        df: &mut DataFrame,
        col_name: &str,
        missing: usize,
        processing_steps: &mut Vec<String>,
    ) -> Result<()> {
        let series = df.column(col_name)?.as_materialized_series().clone();

        let filled = match string_mode(&series) {
            Some(mode_val) => {
                info!("Filled {} NA in {} with mode={}", missing, col_name, mode_val);
                processing_steps.push(format!(
                    "Filled {} missing values in '{}' with mode: '{}'",
                    missing, col_name, mode_val
                ));
                fill_string_nulls(&series, &mode_val)?
            }
            None => {
                info!("Filled {} NA in {} with '{}'", missing, col_name, MISSING_SENTINEL);
                processing_steps.push(format!(
                    "Filled {} missing values in '{}' with '{}'",
                    missing, col_name, MISSING_SENTINEL
                ));
                fill_string_nulls(&series, MISSING_SENTINEL)?
            }
        };

        df.replace(col_name, filled)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn total_nulls(df: &DataFrame) -> usize {
        df.get_columns().iter().map(|c| c.null_count()).sum()
    }

    #[test]
    fn test_numeric_median_fill() {
        let df = df![
            "bedrooms" => [Some(3), Some(2), Some(3), Some(4), Some(3), None],
        ]
        .unwrap();

        let out = fill_missing(&df).unwrap();

        assert_eq!(total_nulls(&out), 0);
        let values: Vec<Option<f64>> = out.column("bedrooms").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(values[5], Some(3.0));
    }

    #[test]
    fn test_median_of_even_count() {
        let df = df!["sqft" => [Some(1.0), None, Some(3.0), Some(10.0), Some(4.0)]].unwrap();
        let out = fill_missing(&df).unwrap();

        let values: Vec<Option<f64>> = out.column("sqft").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(values[1], Some(3.5));
    }

    #[test]
    fn test_nan_cells_are_imputed() {
        let df = df![
            "price" => [100_000i64, 110_000, 115_000],
            "sqft" => [f64::NAN, 1000.0, 1200.0],
        ]
        .unwrap();

        let out = fill_missing(&df).unwrap();

        let values: Vec<Option<f64>> = out.column("sqft").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(1100.0), Some(1000.0), Some(1200.0)]);
    }

    #[test]
    fn test_complete_numeric_column_untouched() {
        let df = df![
            "price" => [100_000i64, 110_000, 115_000],
            "city" => [Some("Leeds"), None, Some("York")],
        ]
        .unwrap();

        let out = fill_missing(&df).unwrap();

        assert_eq!(out.column("price").unwrap().dtype(), &DataType::Int64);
        assert!(out.column("price").unwrap().equals(df.column("price").unwrap()));
    }

    #[test]
    fn test_categorical_mode_fill() {
        let df = df![
            "city" => [Some("Leeds"), Some("Leeds"), Some("York"), None],
        ]
        .unwrap();

        let out = fill_missing(&df).unwrap();

        let values: Vec<Option<&str>> = out.column("city").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("Leeds"), Some("Leeds"), Some("York"), Some("Leeds")]);
    }

    #[test]
    fn test_all_missing_categorical_gets_sentinel() {
        let df = df![
            "price" => [1.0, 2.0, 3.0],
            "city" => [None::<&str>, None, None],
        ]
        .unwrap();

        let out = fill_missing(&df).unwrap();

        let values: Vec<Option<&str>> = out.column("city").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(MISSING_SENTINEL); 3]);
    }

    #[test]
    fn test_all_missing_numeric_gets_zero() {
        let df = df!["lot_size" => [None::<f64>, None]].unwrap();
        let out = fill_missing(&df).unwrap();

        assert_eq!(total_nulls(&out), 0);
        let values: Vec<Option<f64>> = out.column("lot_size").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_input_not_mutated() {
        let df = df!["sqft" => [Some(1.0), None]].unwrap();
        let _ = fill_missing(&df).unwrap();
        assert_eq!(df.column("sqft").unwrap().null_count(), 1);
    }

    #[test]
    fn test_steps_recorded_only_for_filled_columns() {
        let mut df = df![
            "sqft" => [Some(1.0), None],
            "price" => [1.0, 2.0],
        ]
        .unwrap();
        let mut steps = Vec::new();

        StatisticalImputer::impute_all(&mut df, &mut steps).unwrap();

        assert_eq!(steps.len(), 1);
        assert!(steps[0].contains("sqft"));
        assert!(steps[0].contains("median"));
    }
}
