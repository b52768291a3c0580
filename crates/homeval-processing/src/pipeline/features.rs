//! Feature pipeline.
//!
//! load → derive features → drop `price` → fit or load the column transform
//! → transform → save matrix with `price` re-appended → save artifact (fit
//! only). Outputs are written only after every stage has succeeded, and the
//! artifact is replaced only once the matrix is in place.

use crate::clock::{Clock, SystemClock};
use crate::config::FeaturesConfig;
use crate::error::Result;
use crate::features::{ColumnTransform, FittedTransform, PRICE_COLUMN, TransformSpec, create_features};
use crate::io::{load_csv, stage_csv};
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::types::{FeatureResult, FeatureSummary};
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

const TOTAL_STEPS: usize = 4;

/// Whether the column transform is learned in this run or reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformMode {
    /// Fit on the input and persist the artifact (training).
    #[default]
    Fit,
    /// Load a previously persisted artifact (inference, re-scoring).
    Reuse,
}

/// The feature-engineering pipeline.
pub struct FeaturePipeline {
    spec: TransformSpec,
    clock: Arc<dyn Clock>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(FeaturePipeline: Send);

impl FeaturePipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> FeaturePipelineBuilder {
        FeaturePipelineBuilder::default()
    }

    /// Run the stage end to end using the paths in `config`.
    pub fn run(&self, config: &FeaturesConfig, mode: TransformMode) -> Result<FeatureResult> {
        let outcome = self.run_internal(config, mode);
        match outcome {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Feature engineering completed"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Feature engineering failed: {}", e);
                Err(e)
            }
        }
    }

    /// Derive features and fit or apply the transform on an in-memory table.
    ///
    /// Pass `None` to fit a new transform, or a loaded one to reuse it.
    pub fn process(
        &self,
        df: &DataFrame,
        transform: Option<FittedTransform>,
    ) -> Result<FeatureResult> {
        let start_time = Instant::now();

        self.report_progress(ProgressUpdate::new(
            PipelineStage::FeatureEngineering,
            2,
            TOTAL_STEPS,
            "Creating derived features...",
        ));
        let engineered = create_features(df, self.clock.as_ref())?;

        let price = engineered
            .get_column_names()
            .iter()
            .any(|c| c.as_str() == PRICE_COLUMN)
            .then(|| engineered.column(PRICE_COLUMN).cloned())
            .transpose()?;
        let features = match price {
            Some(_) => engineered.drop(PRICE_COLUMN)?,
            None => engineered,
        };

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Transform,
            3,
            TOTAL_STEPS,
            "Transforming columns...",
        ));
        let fitted = transform.is_none();
        let (transform, mut matrix) = match transform {
            Some(existing) => {
                let matrix = existing.transform(&features)?;
                (existing, matrix)
            }
            None => ColumnTransform::new(self.spec.clone()).fit_transform(&features)?,
        };

        let has_target = price.is_some();
        if let Some(price) = price {
            matrix.with_column(price)?;
        }

        let summary = FeatureSummary {
            duration_ms: start_time.elapsed().as_millis() as u64,
            rows: matrix.height(),
            fitted,
            feature_names: transform.feature_names(),
            has_target,
        };

        Ok(FeatureResult {
            data: matrix,
            transform,
            summary,
        })
    }

    fn run_internal(&self, config: &FeaturesConfig, mode: TransformMode) -> Result<FeatureResult> {
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Loading,
            1,
            TOTAL_STEPS,
            format!("Loading {}", config.input.display()),
        ));
        info!("Loading cleaned data from {}", config.input.display());
        let df = load_csv(&config.input)?;

        let existing = match mode {
            TransformMode::Fit => None,
            TransformMode::Reuse => Some(FittedTransform::load(&config.preprocessor)?),
        };

        let mut result = self.process(&df, existing)?;

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Saving,
            4,
            TOTAL_STEPS,
            format!("Saving {}", config.output.display()),
        ));
        // Both outputs are staged before either replaces its destination.
        let artifact = match mode {
            TransformMode::Fit => Some(result.transform.stage(&config.preprocessor)?),
            TransformMode::Reuse => None,
        };
        stage_csv(&mut result.data, &config.output)?.commit()?;
        if let Some(artifact) = artifact {
            artifact.commit()?;
        }

        info!(
            "Saved {} x {} feature matrix to {}",
            result.data.height(),
            result.data.width(),
            config.output.display()
        );
        Ok(result)
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

/// Builder for creating a [`FeaturePipeline`] instance.
#[derive(Default)]
pub struct FeaturePipelineBuilder {
    spec: Option<TransformSpec>,
    clock: Option<Arc<dyn Clock>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl FeaturePipelineBuilder {
    /// Set the numeric/categorical column groups.
    pub fn spec(mut self, spec: TransformSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Set the clock used for `house_age`. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    pub fn build(self) -> FeaturePipeline {
        FeaturePipeline {
            spec: self.spec.unwrap_or_default(),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            progress_reporter: self.progress_reporter,
        }
    }
}

/// Engineer features from `input`, fit and persist the transform to
/// `preprocessor`, and write the matrix to `output`.
pub fn run_feature_engineering(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    preprocessor: impl AsRef<Path>,
    clock: Arc<dyn Clock>,
) -> Result<DataFrame> {
    let config = FeaturesConfig {
        input: input.as_ref().to_path_buf(),
        output: output.as_ref().to_path_buf(),
        preprocessor: preprocessor.as_ref().to_path_buf(),
    };

    let result = FeaturePipeline::builder()
        .clock(clock)
        .build()
        .run(&config, TransformMode::Fit)?;
    Ok(result.data)
}
