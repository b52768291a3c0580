//! Pipeline module.
//!
//! The cleaning and feature orchestrators, the outlier engine they share, and
//! progress reporting.

mod cleaning;
mod features;
pub mod outliers;
pub mod progress;

pub use cleaning::{CleaningPipeline, CleaningPipelineBuilder, INDEX_COLUMN, process_data};
pub use features::{FeaturePipeline, FeaturePipelineBuilder, TransformMode, run_feature_engineering};
pub use outliers::{OutlierBounds, OutlierHandler, OutlierOutcome, apply_outlier_policy, iqr_bounds};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
