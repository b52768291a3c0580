//! Training pipeline.
//!
//! load → check target → seeded train/test split → ridge fit → evaluate →
//! save artifact. The model file is written only after every earlier stage
//! has succeeded.

use crate::config::TrainingConfig;
use crate::error::{LearningError, Result};
use crate::model::{
    MODEL_FORMAT_VERSION, RidgeRegression, TrainedModel, evaluate, frame_to_matrix,
};
use crate::progress::{ProgressCallback, ProgressUpdate, TrainingStage};
use crate::types::{EvaluationSplit, TrainingResult};
use homeval_processing::{Clock, SystemClock, load_csv};
use homeval_processing::utils::is_numeric_dtype;
use ndarray::{Array1, Axis};
use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Trains a regression model on an engineered feature table.
pub struct Trainer {
    config: TrainingConfig,
    clock: Arc<dyn Clock>,
    progress_callback: Option<ProgressCallback>,
}

static_assertions::assert_impl_all!(Trainer: Send, Sync);

impl std::fmt::Debug for Trainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trainer")
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Trainer {
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::default()
    }

    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train on the CSV at `data_path` and save the model to `model_path`.
    pub fn run(
        &self,
        data_path: impl AsRef<Path>,
        model_path: impl AsRef<Path>,
    ) -> Result<TrainingResult> {
        let (data_path, model_path) = (data_path.as_ref(), model_path.as_ref());

        let outcome = self
            .load(data_path)
            .and_then(|df| self.fit(&df))
            .and_then(|(model, result)| {
                self.report(TrainingStage::Saving, 0.9, format!("Saving {}", model_path.display()));
                model.save(model_path)?;
                info!("Saved model '{}' to {}", model.name, model_path.display());
                Ok(result)
            });

        self.finish(outcome)
    }

    /// Train on an in-memory table without persisting anything.
    pub fn train(&self, df: &DataFrame) -> Result<(TrainedModel, TrainingResult)> {
        let outcome = self.fit(df);
        self.finish(outcome)
    }

    fn finish<T>(&self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.report(TrainingStage::Complete, 1.0, "Training completed");
                Ok(value)
            }
            Err(e) => {
                self.report(TrainingStage::Failed, 1.0, e.to_string());
                error!("Training failed: {}", e);
                Err(e)
            }
        }
    }

    fn report(&self, stage: TrainingStage, progress: f64, message: impl Into<String>) {
        if let Some(callback) = &self.progress_callback {
            callback(ProgressUpdate::new(stage, progress, message));
        }
    }

    fn load(&self, data_path: &Path) -> Result<DataFrame> {
        self.report(
            TrainingStage::LoadingData,
            0.1,
            format!("Loading {}", data_path.display()),
        );
        info!("Loading training data from {}", data_path.display());
        Ok(load_csv(data_path)?)
    }

    fn fit(&self, df: &DataFrame) -> Result<(TrainedModel, TrainingResult)> {
        let start_time = Instant::now();
        let config = &self.config;
        let target = config.target_variable.as_str();
        let mut warnings = Vec::new();

        self.report(TrainingStage::Validating, 0.2, "Validating training table...");
        let target_column = df
            .column(target)
            .map_err(|_| LearningError::TargetNotFound(target.to_string()))?;
        if df.height() < 2 {
            return Err(LearningError::InvalidData(format!(
                "need at least 2 rows to train, got {}",
                df.height()
            )));
        }
        if !is_numeric_dtype(target_column.dtype()) {
            return Err(LearningError::InvalidData(format!(
                "target column '{}' is not numeric ({})",
                target,
                target_column.dtype()
            )));
        }

        let feature_names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .filter(|name| name != target)
            .collect();
        if feature_names.is_empty() {
            return Err(LearningError::InvalidData(
                "no feature columns besides the target".to_string(),
            ));
        }

        let x = frame_to_matrix(df, &feature_names)?;
        let y: Array1<f64> = frame_to_matrix(df, &[target.to_string()])?.column(0).to_owned();

        self.report(TrainingStage::Splitting, 0.3, "Splitting train/test rows...");
        let (train_idx, test_idx) = split_indices(df.height(), config.test_size, config.random_seed);
        let (x_train, y_train) = (x.select(Axis(0), &train_idx), y.select(Axis(0), &train_idx));
        info!(
            "Split {} rows into {} train / {} test (seed {})",
            df.height(),
            train_idx.len(),
            test_idx.len(),
            config.random_seed
        );

        self.report(
            TrainingStage::Training,
            0.5,
            format!("Fitting {} on {} features", config.algorithm, feature_names.len()),
        );
        let fit = RidgeRegression::new(config.effective_alpha()).fit(&x_train, &y_train)?;

        self.report(TrainingStage::Evaluation, 0.7, "Evaluating model...");
        let metrics = if test_idx.is_empty() {
            let message = "test split is empty; metrics computed on the training rows".to_string();
            warn!("{}", message);
            warnings.push(message);
            let pred = x_train.dot(&fit.coefficients) + fit.intercept;
            evaluate(&y_train, &pred, EvaluationSplit::Train)
        } else {
            let (x_test, y_test) = (x.select(Axis(0), &test_idx), y.select(Axis(0), &test_idx));
            let pred = x_test.dot(&fit.coefficients) + fit.intercept;
            evaluate(&y_test, &pred, EvaluationSplit::Test)
        };
        info!(
            "{}: MAE = {:.2}, R² = {:.4} ({:?} split)",
            config.algorithm, metrics.mae, metrics.r2, metrics.evaluated_on
        );

        let model = TrainedModel {
            format_version: MODEL_FORMAT_VERSION,
            name: config.name.clone(),
            algorithm: config.algorithm.as_str().to_string(),
            target_variable: target.to_string(),
            feature_names,
            coefficients: fit.coefficients.to_vec(),
            intercept: fit.intercept,
            alpha: config.effective_alpha(),
            metrics: metrics.clone(),
            trained_at: self.clock.now().to_rfc3339(),
        };

        let result = TrainingResult {
            model_name: model.name.clone(),
            algorithm: model.algorithm.clone(),
            metrics,
            feature_importance: model.feature_importance(),
            train_rows: train_idx.len(),
            test_rows: test_idx.len(),
            training_time_seconds: start_time.elapsed().as_secs_f64(),
            warnings,
        };

        Ok((model, result))
    }
}

/// Shuffle `0..n` with a seeded RNG and hold out `floor(n * test_size)` rows.
fn split_indices(n: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_size).floor() as usize;
    let n_test = n_test.min(n.saturating_sub(1));
    let test = indices.split_off(n - n_test);
    (indices, test)
}

/// Builder for [`Trainer`].
#[derive(Default)]
pub struct TrainerBuilder {
    config: Option<TrainingConfig>,
    clock: Option<Arc<dyn Clock>>,
    progress_callback: Option<ProgressCallback>,
}

impl TrainerBuilder {
    #[must_use]
    pub fn config(mut self, config: TrainingConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Clock used to stamp the model artifact. Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Trainer {
        Trainer {
            config: self.config.unwrap_or_default(),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            progress_callback: self.progress_callback,
        }
    }
}

/// Train on `data_path` with `config` and save the model to `model_path`.
pub fn train_model(
    data_path: impl AsRef<Path>,
    model_path: impl AsRef<Path>,
    config: &TrainingConfig,
) -> Result<TrainingResult> {
    Trainer::builder()
        .config(config.clone())
        .build()
        .run(data_path, model_path)
}
