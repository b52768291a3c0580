//! Derived-feature builder.

use crate::clock::Clock;
use crate::error::{ProcessingError, Result};
use crate::schema::require_columns;
use crate::utils::{finite_or_zero, float_values, is_numeric_dtype};
use polars::prelude::*;
use tracing::debug;

/// Columns the feature builder reads.
pub const REQUIRED_FEATURE_INPUTS: [&str; 4] = ["year_built", "bedrooms", "bathrooms", "sqft"];

/// Name of the price column, optional at inference time.
pub const PRICE_COLUMN: &str = "price";

pub const HOUSE_AGE: &str = "house_age";
pub const PRICE_PER_SQFT: &str = "price_per_sqft";
pub const BED_BATH_RATIO: &str = "bed_bath_ratio";

/// Add `house_age`, `price_per_sqft` and `bed_bath_ratio` to a copy of `df`.
///
/// `price_per_sqft` is `0` for every row when `price` is absent. Ratios that
/// are missing or non-finite (division by zero) are replaced with `0`.
/// Missing `year_built` values yield a missing `house_age`.
pub fn create_features(df: &DataFrame, clock: &dyn Clock) -> Result<DataFrame> {
    require_columns(df, &REQUIRED_FEATURE_INPUTS)?;

    let current_year = f64::from(clock.current_year());
    let height = df.height();

    let year_built = numeric_column(df, "year_built")?;
    let bedrooms = numeric_column(df, "bedrooms")?;
    let bathrooms = numeric_column(df, "bathrooms")?;
    let sqft = numeric_column(df, "sqft")?;

    let house_age: Vec<Option<f64>> = year_built
        .iter()
        .map(|year| year.map(|y| current_year - y))
        .collect();

    let price_per_sqft = if df.get_column_names().iter().any(|c| c.as_str() == PRICE_COLUMN) {
        let price = numeric_column(df, PRICE_COLUMN)?;
        finite_or_zero(ratio(&price, &sqft))
    } else {
        debug!("No '{}' column; '{}' set to 0", PRICE_COLUMN, PRICE_PER_SQFT);
        vec![0.0; height]
    };

    let bed_bath_ratio = finite_or_zero(ratio(&bedrooms, &bathrooms));

    let mut out = df.clone();
    out.with_column(Series::new(HOUSE_AGE.into(), house_age))?;
    out.with_column(Series::new(PRICE_PER_SQFT.into(), price_per_sqft))?;
    out.with_column(Series::new(BED_BATH_RATIO.into(), bed_bath_ratio))?;

    debug!("Created derived features for {} rows", height);
    Ok(out)
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?;
    if !is_numeric_dtype(column.dtype()) {
        return Err(ProcessingError::NonNumericColumn(name.to_string()));
    }
    Ok(float_values(column.as_materialized_series())?)
}

fn ratio<'a>(
    numerator: &'a [Option<f64>],
    denominator: &'a [Option<f64>],
) -> impl Iterator<Item = Option<f64>> + 'a {
    numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| match (n, d) {
            (Some(n), Some(d)) => Some(n / d),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use pretty_assertions::assert_eq;

    fn values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name).unwrap().f64().unwrap().into_iter().collect()
    }

    fn houses() -> DataFrame {
        df![
            "price" => [300_000.0, 450_000.0],
            "sqft" => [1500.0, 1800.0],
            "bedrooms" => [3i64, 4],
            "bathrooms" => [2.0, 0.0],
            "year_built" => [2000i64, 1990],
            "location" => ["Leeds", "York"],
            "condition" => ["Good", "Fair"],
        ]
        .unwrap()
    }

    #[test]
    fn test_derived_columns() {
        let out = create_features(&houses(), &FixedClock::at_year(2025)).unwrap();

        assert_eq!(values(&out, HOUSE_AGE), vec![Some(25.0), Some(35.0)]);
        assert_eq!(values(&out, PRICE_PER_SQFT), vec![Some(200.0), Some(250.0)]);
        assert_eq!(values(&out, BED_BATH_RATIO), vec![Some(1.5), Some(0.0)]);
    }

    #[test]
    fn test_categoricals_untouched() {
        let df = houses();
        let out = create_features(&df, &FixedClock::at_year(2025)).unwrap();

        assert!(out.column("location").unwrap().equals(df.column("location").unwrap()));
        assert!(out.column("condition").unwrap().equals(df.column("condition").unwrap()));
    }

    #[test]
    fn test_price_per_sqft_placeholder_without_price() {
        let df = houses().drop("price").unwrap();
        let out = create_features(&df, &FixedClock::at_year(2025)).unwrap();

        assert_eq!(values(&out, PRICE_PER_SQFT), vec![Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_zero_sqft_gives_zero_price_per_sqft() {
        let df = df![
            "price" => [100_000.0],
            "sqft" => [0.0],
            "bedrooms" => [2.0],
            "bathrooms" => [1.0],
            "year_built" => [2010.0],
        ]
        .unwrap();

        let out = create_features(&df, &FixedClock::at_year(2025)).unwrap();
        assert_eq!(values(&out, PRICE_PER_SQFT), vec![Some(0.0)]);
    }

    #[test]
    fn test_missing_bedrooms_ratio_is_zero() {
        let df = df![
            "sqft" => [1000.0],
            "bedrooms" => [None::<f64>],
            "bathrooms" => [1.0],
            "year_built" => [2010.0],
        ]
        .unwrap();

        let out = create_features(&df, &FixedClock::at_year(2025)).unwrap();
        assert_eq!(values(&out, BED_BATH_RATIO), vec![Some(0.0)]);
    }

    #[test]
    fn test_missing_required_column() {
        let df = houses().drop("year_built").unwrap();
        let err = create_features(&df, &FixedClock::at_year(2025)).unwrap_err();

        match err {
            ProcessingError::Schema { missing } => assert_eq!(missing, vec!["year_built".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_input_not_mutated() {
        let df = houses();
        let _ = create_features(&df, &FixedClock::at_year(2025)).unwrap();
        assert_eq!(df.width(), 7);
    }
}
