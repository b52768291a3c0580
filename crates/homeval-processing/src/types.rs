use crate::features::FittedTransform;
use crate::pipeline::outliers::OutlierOutcome;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Output of a cleaning run.
#[derive(Debug, Clone)]
pub struct CleaningResult {
    /// The cleaned table: no missing cells, outlier policy applied.
    pub data: DataFrame,
    pub summary: CleaningSummary,
}

/// Serializable summary of what a cleaning run did.
///
/// ```rust,ignore
/// let result = pipeline.process(df)?;
/// println!(
///     "Kept {} of {} rows in {}ms",
///     result.summary.rows_after, result.summary.rows_before, result.summary.duration_ms
/// );
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleaningSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    pub rows_before: usize,
    pub rows_after: usize,
    pub columns: usize,

    /// Missing cells filled by imputation.
    pub cells_imputed: usize,

    /// What the outlier policy did to the target column.
    pub outliers: OutlierOutcome,

    /// Human-readable log of each step taken.
    pub processing_steps: Vec<String>,
}

impl CleaningSummary {
    /// Number of rows dropped by the run.
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}

/// Output of a feature-engineering run.
#[derive(Debug, Clone)]
pub struct FeatureResult {
    /// The model matrix, with `price` appended when the input had one.
    pub data: DataFrame,
    /// The transform that produced `data`.
    pub transform: FittedTransform,
    pub summary: FeatureSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub duration_ms: u64,
    pub rows: usize,
    /// Whether the transform was fitted in this run (as opposed to loaded).
    pub fitted: bool,
    pub feature_names: Vec<String>,
    /// Whether the target column was carried through to the output.
    pub has_target: bool,
}
