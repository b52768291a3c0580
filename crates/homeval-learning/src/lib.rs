//! homeval-learning: ridge-regression training and load-once inference for
//! house-price valuation.
//!
//! The crate consumes the engineered feature table and fitted column
//! transform produced by `homeval-processing`.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use homeval_learning::{PredictionRequest, TrainingConfig, train_model};
//!
//! // Train on the engineered feature matrix
//! let config = TrainingConfig::from_file("configs/model_config.toml")?;
//! let result = train_model(
//!     "data/processed/engineered_features.csv",
//!     "models/trained/house_price_model.json",
//!     &config,
//! )?;
//! println!("R² = {:.4}", result.metrics.r2);
//!
//! // Load the artifacts once, then predict
//! homeval_learning::initialize(
//!     "models/trained/house_price_model.json",
//!     "models/trained/preprocessor.json",
//! )?;
//! let response = homeval_learning::predictor()?.predict(&PredictionRequest {
//!     sqft: 1500.0,
//!     bedrooms: 3,
//!     bathrooms: 2.0,
//!     location: "Leeds".into(),
//!     year_built: 2000,
//!     condition: "Good".into(),
//! })?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! engineered_features.csv ──► Trainer ──► TrainedModel (JSON)
//!                                               │
//! PredictionRequest ──► create_features ──► FittedTransform ──► Predictor
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`]. Errors from
//! the processing stages are wrapped in [`LearningError::Processing`].

mod config;
mod error;
mod inference;
mod model;
mod pipeline;
mod progress;
mod types;

// Configuration types
pub use config::{Algorithm, TrainingConfig, TrainingConfigBuilder};
// Error types
pub use error::{LearningError, Result};
// Inference
pub use inference::{
    CONFIDENCE_MARGIN, MAX_YEAR_BUILT, MIN_YEAR_BUILT, Predictor, health, initialize,
    is_initialized, predictor,
};
// Model types
pub use model::{MODEL_FORMAT_VERSION, RidgeFit, RidgeRegression, TrainedModel, evaluate};
// Training
pub use pipeline::{Trainer, TrainerBuilder, train_model};
// Progress reporting types
pub use progress::{ProgressCallback, ProgressUpdate, TrainingStage};
// Result and payload types
pub use types::{
    EvaluationSplit, HealthStatus, Metrics, PredictionRequest, PredictionResponse, TrainingResult,
};
