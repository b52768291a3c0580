//! Progress reporting for the cleaning and feature pipelines.
//!
//! Updates are informational only; a reporter can never change the outcome
//! of a run.
//!
//! # Example
//!
//! ```rust,ignore
//! use homeval_processing::{CleaningPipeline, ProcessorConfig};
//!
//! let pipeline = CleaningPipeline::builder()
//!     .config(ProcessorConfig::default())
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the cleaning and feature pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading the input CSV
    Loading,
    /// Checking required columns
    Validation,
    /// Filling missing values
    Imputation,
    /// Applying the outlier policy to the target column
    OutlierHandling,
    /// Computing derived columns
    FeatureEngineering,
    /// Fitting or applying the column transform
    Transform,
    /// Writing outputs
    Saving,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Data",
            Self::Validation => "Validating Schema",
            Self::Imputation => "Imputing Values",
            Self::OutlierHandling => "Handling Outliers",
            Self::FeatureEngineering => "Engineering Features",
            Self::Transform => "Transforming Columns",
            Self::Saving => "Saving Outputs",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }
}

/// A single progress update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: PipelineStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Human-readable message describing current activity
    pub message: String,
}

impl ProgressUpdate {
    /// Creates an update for step `step` of `total_steps` (1-based).
    pub fn new(
        stage: PipelineStage,
        step: usize,
        total_steps: usize,
        message: impl Into<String>,
    ) -> Self {
        let progress = if total_steps > 0 {
            step as f32 / total_steps as f32
        } else {
            0.0
        };
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Complete,
            progress: 1.0,
            message: message.into(),
        }
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Failed,
            progress: 0.0,
            message: message.into(),
        }
    }
}

/// Trait for receiving progress updates from a pipeline.
///
/// Implementations must be `Send + Sync` so a pipeline can be driven from a
/// background thread.
pub trait ProgressReporter: Send + Sync {
    /// Called once per stage transition.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
