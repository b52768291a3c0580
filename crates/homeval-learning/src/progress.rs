//! Progress reporting types for model training.
//!
//! A [`Trainer`](crate::Trainer) built with
//! [`on_progress`](crate::TrainerBuilder::on_progress) emits a
//! [`ProgressUpdate`] as it enters each [`TrainingStage`].
//!
//! # Example
//!
//! ```no_run
//! use homeval_learning::{ProgressUpdate, Trainer, TrainingConfig};
//!
//! let trainer = Trainer::builder()
//!     .config(TrainingConfig::default())
//!     .on_progress(|update: ProgressUpdate| {
//!         println!("[{}] {:.0}% - {}", update.stage, update.progress * 100.0, update.message);
//!     })
//!     .build();
//! ```

use std::fmt;
use std::sync::Arc;

/// The current stage of a training run.
///
/// Runs move through the stages in declaration order and end in either
/// [`Complete`](Self::Complete) or [`Failed`](Self::Failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[non_exhaustive]
pub enum TrainingStage {
    /// Reading the engineered feature table. Skipped for in-memory tables.
    #[default]
    LoadingData,

    /// Checking the target and row count.
    Validating,

    /// Shuffling rows into train and test splits.
    Splitting,

    /// Solving for the coefficients.
    Training,

    Evaluation,

    /// Writing the model artifact.
    Saving,

    Complete,

    Failed,
}

impl TrainingStage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStage::LoadingData => "loading_data",
            TrainingStage::Validating => "validating",
            TrainingStage::Splitting => "splitting",
            TrainingStage::Training => "training",
            TrainingStage::Evaluation => "evaluation",
            TrainingStage::Saving => "saving",
            TrainingStage::Complete => "complete",
            TrainingStage::Failed => "failed",
        }
    }
}

impl fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A progress update emitted during training.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressUpdate {
    pub stage: TrainingStage,

    /// Overall progress from 0.0 to 1.0.
    pub progress: f64,

    pub message: String,
}

impl ProgressUpdate {
    pub(crate) fn new(stage: TrainingStage, progress: f64, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }
}

/// Callback invoked with each [`ProgressUpdate`].
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_stage_display() {
        assert_eq!(TrainingStage::LoadingData.to_string(), "loading_data");
        assert_eq!(TrainingStage::Validating.to_string(), "validating");
        assert_eq!(TrainingStage::Complete.to_string(), "complete");
    }

    #[test]
    fn test_training_stage_order() {
        assert!(TrainingStage::LoadingData < TrainingStage::Validating);
        assert!(TrainingStage::Evaluation < TrainingStage::Saving);
        assert!(TrainingStage::Saving < TrainingStage::Complete);
    }

    #[test]
    fn test_progress_clamped() {
        let update = ProgressUpdate::new(TrainingStage::Training, 1.7, "fitting");
        assert_eq!(update.progress, 1.0);
        assert_eq!(update.message, "fitting");
    }
}
