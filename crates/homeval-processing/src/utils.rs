//! Shared utilities for the processing pipeline.
//!
//! Small helpers over polars types used by the imputer, the outlier engine,
//! the feature builder and the column transform.

use polars::prelude::*;
use std::collections::BTreeMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Owned column names of a DataFrame, in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

// =============================================================================
// Series Statistics Utilities
// =============================================================================

/// Collect a numeric Series as `f64` values, preserving nulls.
pub fn float_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats.f64()?.into_iter().collect())
}

/// Non-null values of a numeric Series, sorted ascending.
///
/// NaN values are treated like nulls.
pub fn sorted_non_null(series: &Series) -> PolarsResult<Vec<f64>> {
    let mut values: Vec<f64> = float_values(series)?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect();
    values.sort_by(f64::total_cmp);
    Ok(values)
}

/// Number of missing cells in a Series: nulls plus NaN floats.
pub fn missing_count(series: &Series) -> PolarsResult<usize> {
    let nan_count = match series.dtype() {
        DataType::Float32 | DataType::Float64 => float_values(series)?
            .into_iter()
            .flatten()
            .filter(|v| v.is_nan())
            .count(),
        _ => 0,
    };
    Ok(series.null_count() + nan_count)
}

/// Quantile of pre-sorted values by linear interpolation.
///
/// The rank is `(n - 1) * q`; the result interpolates between the two
/// neighbouring order statistics. Returns `None` for an empty slice.
pub fn quantile_linear(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let rank = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Mean of the non-null values of a numeric Series.
pub fn non_null_mean(series: &Series) -> PolarsResult<Option<f64>> {
    let values = sorted_non_null(series)?;
    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(values.iter().sum::<f64>() / values.len() as f64))
}

/// Calculate the mode (most frequent value) of a Series as a string.
///
/// Ties are broken by the lexicographically smallest value so the result is
/// deterministic. Returns `None` when the Series has no non-null values.
pub fn string_mode(series: &Series) -> Option<String> {
    let non_null = series.drop_nulls();
    if non_null.is_empty() {
        return None;
    }

    let str_series = non_null.cast(&DataType::String).ok()?;
    let str_chunked = str_series.str().ok()?;

    let mut value_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for val in str_chunked.into_iter().flatten() {
        *value_counts.entry(val).or_insert(0) += 1;
    }

    // BTreeMap iterates in key order, so the first maximum wins ties.
    let mut best: Option<(&str, usize)> = None;
    for (val, count) in value_counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((val, count));
        }
    }

    best.map(|(val, _)| val.to_string())
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null and NaN values in a numeric Series with a specific value.
///
/// The result is always `Float64`.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let filled: Vec<f64> = float_values(series)?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()).unwrap_or(fill_value))
        .collect();

    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a Series with a string value.
///
/// The result is always `String`; non-null values are cast, not reformatted.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let as_str = series.cast(&DataType::String)?;
    let filled: Vec<String> = as_str
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or(fill_value).to_string())
        .collect();

    Ok(Series::new(series.name().clone(), filled))
}

/// Replace non-finite values (and nulls) with `0.0`.
pub fn finite_or_zero(values: impl IntoIterator<Item = Option<f64>>) -> Vec<f64> {
    values
        .into_iter()
        .map(|v| match v {
            Some(x) if x.is_finite() => x,
            _ => 0.0,
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_quantile_linear_matches_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_linear(&sorted, 0.25), Some(1.75));
        assert_eq!(quantile_linear(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile_linear(&sorted, 0.75), Some(3.25));
        assert_eq!(quantile_linear(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_linear(&sorted, 1.0), Some(4.0));
    }

    #[test]
    fn test_quantile_linear_single_and_empty() {
        assert_eq!(quantile_linear(&[7.0], 0.25), Some(7.0));
        assert_eq!(quantile_linear(&[], 0.5), None);
    }

    #[test]
    fn test_sorted_non_null_skips_nulls() {
        let series = Series::new("v".into(), &[Some(3.0), None, Some(1.0), Some(2.0)]);
        assert_eq!(sorted_non_null(&series).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_non_null_mean() {
        let series = Series::new("v".into(), &[Some(1), None, Some(3)]);
        assert_eq!(non_null_mean(&series).unwrap(), Some(2.0));

        let empty = Series::new("v".into(), &[None::<f64>, None]);
        assert_eq!(non_null_mean(&empty).unwrap(), None);
    }

    #[test]
    fn test_string_mode() {
        let series = Series::new("test".into(), &["a", "b", "a", "c", "a"]);
        assert_eq!(string_mode(&series), Some("a".to_string()));
    }

    #[test]
    fn test_string_mode_tie_takes_smallest() {
        let series = Series::new("test".into(), &["York", "Leeds", "York", "Leeds"]);
        assert_eq!(string_mode(&series), Some("Leeds".to_string()));
    }

    #[test]
    fn test_string_mode_all_null() {
        let series = Series::new("test".into(), &[None::<&str>, None]);
        assert_eq!(string_mode(&series), None);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("test".into(), &[Some(1.0), None, Some(3.0)]);
        let filled = fill_numeric_nulls(&series, 0.0).unwrap();

        assert_eq!(filled.null_count(), 0);
        let values: Vec<Option<f64>> = filled.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(1.0), Some(0.0), Some(3.0)]);
    }

    #[test]
    fn test_fill_numeric_nulls_replaces_nan() {
        let series = Series::new("sqft".into(), &[Some(f64::NAN), None, Some(1000.0)]);
        assert_eq!(missing_count(&series).unwrap(), 2);

        let filled = fill_numeric_nulls(&series, 1000.0).unwrap();
        assert_eq!(missing_count(&filled).unwrap(), 0);
    }

    #[test]
    fn test_missing_count_ignores_integer_columns() {
        let series = Series::new("beds".into(), &[Some(3i64), None, Some(2)]);
        assert_eq!(missing_count(&series).unwrap(), 1);
    }

    #[test]
    fn test_fill_string_nulls() {
        let series = Series::new("city".into(), &[Some("Leeds"), None]);
        let filled = fill_string_nulls(&series, "UNKNOWN").unwrap();

        let values: Vec<Option<&str>> = filled.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("Leeds"), Some("UNKNOWN")]);
    }

    #[test]
    fn test_finite_or_zero() {
        let cleaned = finite_or_zero([Some(1.5), Some(f64::INFINITY), None, Some(f64::NAN)]);
        assert_eq!(cleaned, vec![1.5, 0.0, 0.0, 0.0]);
    }
}
