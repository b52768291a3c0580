//! Error types for the homeval-learning crate.
//!
//! [`LearningError`] is returned by every fallible operation in the crate.
//! Failures raised by the processing stages (feature derivation, the fitted
//! column transform, CSV I/O) are wrapped unchanged in
//! [`LearningError::Processing`].
//!
//! # Example
//!
//! ```no_run
//! use homeval_learning::{LearningError, TrainingConfig};
//!
//! fn configure() -> Result<TrainingConfig, LearningError> {
//!     let config = TrainingConfig::builder()
//!         .target_variable("price")
//!         .test_size(0.25)
//!         .build()?;
//!     Ok(config)
//! }
//! ```

use homeval_processing::ProcessingError;
use std::path::Path;
use thiserror::Error;

/// Result type alias using [`LearningError`].
pub type Result<T> = std::result::Result<T, LearningError>;

/// The main error type for homeval-learning operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid training configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The training table cannot be used to fit a model.
    ///
    /// Raised for tables with fewer than two rows or with a non-numeric
    /// feature column.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The configured target column is not in the training table.
    #[error("Target column '{0}' not found")]
    TargetNotFound(String),

    /// The solver could not produce coefficients.
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// A prediction request violated one or more field constraints.
    ///
    /// Every violation is listed, separated by `"; "`.
    #[error("Invalid request: {}", .0.join("; "))]
    InvalidRequest(Vec<String>),

    /// The process-wide predictor was used before [`initialize`](crate::initialize).
    #[error("Predictor not initialized; call initialize() first")]
    NotInitialized,

    /// A model artifact is absent, unreadable or in an unsupported format.
    #[error("Failed to load artifact {path}: {reason}")]
    ArtifactLoad {
        /// The artifact path.
        path: String,
        /// Why loading failed.
        reason: String,
    },

    /// Error raised by the processing stages.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model or request (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LearningError {
    pub(crate) fn artifact_load(path: impl AsRef<Path>, reason: impl ToString) -> Self {
        LearningError::ArtifactLoad {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for LearningError {
    fn from(err: polars::error::PolarsError) -> Self {
        LearningError::Processing(ProcessingError::from(err))
    }
}
