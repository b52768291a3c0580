//! Outlier handling module.
//!
//! Tukey IQR bounds for a numeric column and the filter/clip/none policies
//! applied to the target column during cleaning.

use crate::config::OutlierPolicy;
use crate::error::{ProcessingError, Result};
use crate::schema::require_columns;
use crate::utils::{float_values, is_numeric_dtype, quantile_linear, sorted_non_null};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Inclusive value range outside of which a value is an outlier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    /// Whether `value` lies within `[lower, upper]`.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Cap `value` into `[lower, upper]`.
    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }
}

/// What a policy application did to the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutlierOutcome {
    /// Bounds used, `None` when the policy is `none`.
    pub bounds: Option<OutlierBounds>,
    pub rows_removed: usize,
    pub values_clipped: usize,
}

/// Compute Tukey IQR bounds for a numeric Series.
///
/// Q1 and Q3 are linear-interpolation quantiles over the sorted non-missing
/// values; the bounds are `Q1 - k*IQR` and `Q3 + k*IQR`.
pub fn iqr_bounds(series: &Series, k: f64) -> Result<OutlierBounds> {
    validate_multiplier(k)?;

    if !is_numeric_dtype(series.dtype()) {
        return Err(ProcessingError::NonNumericColumn(series.name().to_string()));
    }

    let sorted = sorted_non_null(series)?;
    let (Some(q1), Some(q3)) = (quantile_linear(&sorted, 0.25), quantile_linear(&sorted, 0.75))
    else {
        return Err(ProcessingError::NoValidValues(series.name().to_string()));
    };

    let iqr = q3 - q1;
    Ok(OutlierBounds {
        lower: q1 - k * iqr,
        upper: q3 + k * iqr,
    })
}

/// Apply an outlier policy to one column and return the resulting table.
///
/// The input table is never modified.
pub fn apply_outlier_policy(
    df: &DataFrame,
    column: &str,
    policy: OutlierPolicy,
    k: f64,
) -> Result<DataFrame> {
    let mut out = df.clone();
    let mut steps = Vec::new();
    OutlierHandler::handle_outliers(&mut out, column, policy, k, &mut steps)?;
    Ok(out)
}

fn validate_multiplier(k: f64) -> Result<()> {
    if k.is_finite() && k >= 0.0 {
        Ok(())
    } else {
        Err(ProcessingError::InvalidConfig(format!(
            "IQR multiplier must be a finite, non-negative number (got {k})"
        )))
    }
}

/// Handles outlier detection and treatment.
pub struct OutlierHandler;

impl OutlierHandler {
    /// Handle outliers in `column` according to `policy`.
    pub fn handle_outliers(
        df: &mut DataFrame,
        column: &str,
        policy: OutlierPolicy,
        k: f64,
        processing_steps: &mut Vec<String>,
    ) -> Result<OutlierOutcome> {
        if policy == OutlierPolicy::None {
            debug!("Outlier policy is 'none'; '{}' left unchanged", column);
            processing_steps.push(format!("Kept all outliers in '{}'", column));
            return Ok(OutlierOutcome::default());
        }

        require_columns(df, &[column])?;
        if df.height() == 0 {
            validate_multiplier(k)?;
            debug!("Table is empty; '{}' left unchanged", column);
            processing_steps.push(format!("No rows to check for outliers in '{}'", column));
            return Ok(OutlierOutcome::default());
        }

        let series = df.column(column)?.as_materialized_series().clone();
        let bounds = iqr_bounds(&series, k)?;

        match policy {
            OutlierPolicy::Filter => Self::remove_outliers(df, &series, bounds, processing_steps),
            OutlierPolicy::Clip => Self::cap_outliers(df, &series, bounds, processing_steps),
            OutlierPolicy::None => Ok(OutlierOutcome::default()),
        }
    }

    /// Drop rows whose value lies outside the bounds. Missing values are dropped.
    fn remove_outliers(
        df: &mut DataFrame,
        series: &Series,
        bounds: OutlierBounds,
        processing_steps: &mut Vec<String>,
    ) -> Result<OutlierOutcome> {
        let original_rows = df.height();

        let mask_values: Vec<bool> = float_values(series)?
            .into_iter()
            .map(|v| v.is_some_and(|val| bounds.contains(val)))
            .collect();

        let mask = BooleanChunked::from_slice("mask".into(), &mask_values);
        *df = df.filter(&mask)?;

        let rows_removed = original_rows - df.height();
        info!(
            "Filtered {} rows from '{}' outside [{:.2}, {:.2}]",
            rows_removed,
            series.name(),
            bounds.lower,
            bounds.upper
        );
        processing_steps.push(format!(
            "Removed {} rows with outliers in '{}'",
            rows_removed,
            series.name()
        ));

        Ok(OutlierOutcome {
            bounds: Some(bounds),
            rows_removed,
            values_clipped: 0,
        })
    }

    /// Cap values into the bounds; the row count is unchanged.
    fn cap_outliers(
        df: &mut DataFrame,
        series: &Series,
        bounds: OutlierBounds,
        processing_steps: &mut Vec<String>,
    ) -> Result<OutlierOutcome> {
        let values = float_values(series)?;

        let values_clipped = values
            .iter()
            .flatten()
            .filter(|val| !bounds.contains(**val))
            .count();

        let capped: Vec<Option<f64>> = values
            .into_iter()
            .map(|v| v.map(|val| bounds.clamp(val)))
            .collect();

        df.replace(series.name().as_str(), Series::new(series.name().clone(), capped))?;

        info!(
            "Clipped {} values in '{}' to [{:.2}, {:.2}]",
            values_clipped,
            series.name(),
            bounds.lower,
            bounds.upper
        );
        processing_steps.push(format!(
            "Capped {} outliers in '{}' at IQR bounds",
            values_clipped,
            series.name()
        ));

        Ok(OutlierOutcome {
            bounds: Some(bounds),
            rows_removed: 0,
            values_clipped,
        })
    }
}
