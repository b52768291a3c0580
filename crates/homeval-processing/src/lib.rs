//! House-price data processing library.
//!
//! Cleans raw listing data and turns it into a model-ready feature matrix,
//! built on Polars.
//!
//! # Overview
//!
//! - **Schema validation**: required columns checked by name, every missing one reported
//! - **Imputation**: median for numeric columns, mode (or `"UNKNOWN"`) for categorical ones
//! - **Outlier handling**: Tukey IQR bounds with filter, clip or no-op policies
//! - **Derived features**: `house_age`, `price_per_sqft`, `bed_bath_ratio`
//! - **Column transform**: fit once, persist, reuse verbatim at inference time
//! - **Progress reporting**: stage-level updates to a trait object or closure
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use homeval_processing::{
//!     CleaningPipeline, FeaturePipeline, FeaturesConfig, ProcessorConfig, TransformMode,
//! };
//!
//! let config = ProcessorConfig::builder().iqr_multiplier(2.0).build()?;
//! CleaningPipeline::builder()
//!     .config(config)
//!     .on_progress(|update| println!("[{:.0}%] {}", update.progress * 100.0, update.message))
//!     .build()?
//!     .run("data/raw/house_data.csv", "data/processed/cleaned_house_data.csv")?;
//!
//! FeaturePipeline::builder()
//!     .build()
//!     .run(&FeaturesConfig::default(), TransformMode::Fit)?;
//! ```
//!
//! # Inference
//!
//! The fitted transform is loaded with [`FittedTransform::load`] and applied
//! with [`FittedTransform::transform`]; it is never refit.

pub mod clock;
pub mod config;
pub mod error;
pub mod features;
pub mod imputers;
pub mod io;
pub mod pipeline;
pub mod schema;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    ConfigFormat, ConfigValidationError, FeaturesConfig, OutlierPolicy, ProcessorConfig, ProcessorConfigBuilder,
};
pub use error::{ProcessingError, Result as ProcessingResult, ResultExt};
pub use features::{ColumnTransform, FittedTransform, TransformSpec, create_features};
pub use imputers::{MISSING_SENTINEL, StatisticalImputer, fill_missing};
pub use io::{StagedWrite, load_csv, save_csv, stage_bytes, stage_csv, write_atomic};
pub use pipeline::{
    CleaningPipeline, CleaningPipelineBuilder, ClosureProgressReporter, FeaturePipeline,
    FeaturePipelineBuilder, OutlierBounds, OutlierHandler, OutlierOutcome, PipelineStage,
    ProgressReporter, ProgressUpdate, TransformMode, apply_outlier_policy, iqr_bounds,
    process_data, run_feature_engineering,
};
pub use schema::require_columns;
pub use types::{CleaningResult, CleaningSummary, FeatureResult, FeatureSummary};
