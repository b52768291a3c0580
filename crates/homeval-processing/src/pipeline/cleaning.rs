//! Cleaning pipeline.
//!
//! Single pass, fail fast: load → validate target → impute → outlier policy
//! → save. Any stage error aborts the run and nothing is written.

use crate::config::{ConfigValidationError, ProcessorConfig};
use crate::error::Result;
use crate::imputers::StatisticalImputer;
use crate::io::{load_csv, save_csv};
use crate::pipeline::outliers::OutlierHandler;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::schema::require_columns;
use crate::types::{CleaningResult, CleaningSummary};
use crate::utils::missing_count;
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Name of the column holding each row's original position.
pub const INDEX_COLUMN: &str = "index";

const TOTAL_STEPS: usize = 5;

/// The cleaning pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use homeval_processing::{CleaningPipeline, OutlierPolicy, ProcessorConfig};
///
/// let config = ProcessorConfig::builder()
///     .outlier_policy(OutlierPolicy::Clip)
///     .build()?;
///
/// let result = CleaningPipeline::builder()
///     .config(config)
///     .build()?
///     .run("data/raw/house_data.csv", "data/processed/cleaned_house_data.csv")?;
/// ```
pub struct CleaningPipeline {
    config: ProcessorConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(CleaningPipeline: Send);

impl CleaningPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> CleaningPipelineBuilder {
        CleaningPipelineBuilder::default()
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Load `input`, clean it and write the result to `output`.
    pub fn run(&self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<CleaningResult> {
        let (input, output) = (input.as_ref(), output.as_ref());

        let outcome = self.load(input).and_then(|df| self.clean(df)).and_then(|mut result| {
            self.report_progress(ProgressUpdate::new(
                PipelineStage::Saving,
                5,
                TOTAL_STEPS,
                format!("Saving {}", output.display()),
            ));
            save_csv(&mut result.data, output)?;
            info!("Saved cleaned data to {}", output.display());
            Ok(result)
        });

        self.finish(outcome)
    }

    /// Clean an in-memory DataFrame.
    pub fn process(&self, df: DataFrame) -> Result<CleaningResult> {
        let outcome = self.clean(df);
        self.finish(outcome)
    }

    fn finish(&self, outcome: Result<CleaningResult>) -> Result<CleaningResult> {
        match outcome {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Cleaning completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Cleaning failed: {}", e);
                Err(e)
            }
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn load(&self, input: &Path) -> Result<DataFrame> {
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Loading,
            1,
            TOTAL_STEPS,
            format!("Loading {}", input.display()),
        ));
        info!("Loading data from {}", input.display());
        load_csv(input)
    }

    fn clean(&self, df: DataFrame) -> Result<CleaningResult> {
        let start_time = Instant::now();
        let mut summary = CleaningSummary {
            rows_before: df.height(),
            ..Default::default()
        };

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Validation,
            2,
            TOTAL_STEPS,
            "Validating schema...",
        ));
        require_columns(&df, &[self.config.target.as_str()])?;

        let mut df = if self.config.save_index {
            df.with_row_index(INDEX_COLUMN.into(), None)?
        } else {
            df
        };

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Imputation,
            3,
            TOTAL_STEPS,
            "Imputing missing values...",
        ));
        let mut missing_before = 0;
        for column in df.get_columns() {
            missing_before += missing_count(column.as_materialized_series())?;
        }
        StatisticalImputer::impute_all(&mut df, &mut summary.processing_steps)?;
        summary.cells_imputed = missing_before;

        self.report_progress(ProgressUpdate::new(
            PipelineStage::OutlierHandling,
            4,
            TOTAL_STEPS,
            format!("Applying '{}' outlier policy", self.config.outlier_policy),
        ));
        summary.outliers = OutlierHandler::handle_outliers(
            &mut df,
            &self.config.target,
            self.config.outlier_policy,
            self.config.iqr_multiplier,
            &mut summary.processing_steps,
        )?;

        summary.rows_after = df.height();
        summary.columns = df.width();
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Cleaning complete: {} -> {} rows in {}ms",
            summary.rows_before, summary.rows_after, summary.duration_ms
        );

        Ok(CleaningResult { data: df, summary })
    }
}

/// Builder for creating a [`CleaningPipeline`] instance.
#[derive(Default)]
pub struct CleaningPipelineBuilder {
    config: Option<ProcessorConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl CleaningPipelineBuilder {
    /// Set the processor configuration.
    pub fn config(mut self, config: ProcessorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<CleaningPipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(CleaningPipeline {
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}

/// Clean `input` and write the result to `output`.
///
/// Returns the cleaned table.
pub fn process_data(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &ProcessorConfig,
) -> Result<DataFrame> {
    let pipeline = CleaningPipeline::builder().config(config.clone()).build()?;
    Ok(pipeline.run(input, output)?.data)
}
