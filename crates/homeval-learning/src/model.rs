//! Ridge regression and the persisted model artifact.
//!
//! [`RidgeRegression`] solves the centred normal equations
//! `(XᵀX + αI) w = Xᵀy` with a Cholesky factorisation, retrying once with a
//! tiny diagonal shift when the system is not positive definite and falling
//! back to Gauss-Jordan inversion after that. The intercept is recovered from
//! the column means.
//!
//! [`TrainedModel`] is what gets written to disk: coefficients keyed by the
//! feature names of the training matrix, so prediction can select columns
//! by name rather than by position.

use crate::error::{LearningError, Result};
use crate::types::{EvaluationSplit, Metrics};
use homeval_processing::utils::is_numeric_dtype;
use homeval_processing::write_atomic;
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Version written into every model artifact.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Solve the symmetric positive-definite system `a x = b`.
///
/// Retries once with a diagonal shift proportional to the mean diagonal if
/// `a` is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let l = match cholesky_factor(a) {
        Some(l) => l,
        None => {
            let shift = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
            let mut shifted = a.clone();
            for k in 0..n {
                shifted[[k, k]] += shift;
            }
            cholesky_factor(&shifted)?
        }
    };

    // L y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Lᵀ x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Lower-triangular `L` with `a = L Lᵀ`, or `None` if `a` is not positive definite.
fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    Some(l)
}

/// Gauss-Jordan inversion with partial pivoting.
fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }

        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    let mut inv = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }

    Some(inv)
}

/// L2-regularised least squares with an intercept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RidgeRegression {
    alpha: f64,
}

/// Coefficients and intercept produced by [`RidgeRegression::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeFit {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl RidgeRegression {
    /// `alpha = 0` gives ordinary least squares.
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<RidgeFit> {
        let (n_samples, n_features) = x.dim();
        if n_samples != y.len() {
            return Err(LearningError::InvalidData(format!(
                "feature matrix has {} rows but target has {}",
                n_samples,
                y.len()
            )));
        }
        if n_samples == 0 {
            return Err(LearningError::InvalidData("no rows to fit".to_string()));
        }

        let x_mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let y_mean = y.mean().unwrap_or(0.0);
        let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
        let y_centered = y - y_mean;

        let mut xtx = x_centered.t().dot(&x_centered);
        for i in 0..n_features {
            xtx[[i, i]] += self.alpha;
        }
        let xty = x_centered.t().dot(&y_centered);

        let coefficients = match cholesky_solve(&xtx, &xty) {
            Some(coef) => coef,
            None => {
                debug!("Cholesky solve failed, falling back to Gauss-Jordan inversion");
                let inv = matrix_inverse(&xtx).ok_or_else(|| {
                    LearningError::TrainingFailed(
                        "normal equations are singular; try a larger alpha".to_string(),
                    )
                })?;
                inv.dot(&xty)
            }
        };

        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(LearningError::TrainingFailed(
                "solver produced non-finite coefficients".to_string(),
            ));
        }

        let intercept = y_mean - coefficients.dot(&x_mean);
        Ok(RidgeFit {
            coefficients,
            intercept,
        })
    }
}

/// MAE, RMSE and R² of `y_pred` against `y_true`.
///
/// R² is `1.0` when `y_true` is constant.
pub fn evaluate(y_true: &Array1<f64>, y_pred: &Array1<f64>, split: EvaluationSplit) -> Metrics {
    let n = y_true.len().max(1) as f64;
    let residuals = y_true - y_pred;

    let mae = residuals.mapv(f64::abs).sum() / n;
    let ss_res = residuals.mapv(|r| r * r).sum();
    let rmse = (ss_res / n).sqrt();

    let y_mean = y_true.mean().unwrap_or(0.0);
    let ss_tot = y_true.mapv(|v| (v - y_mean).powi(2)).sum();
    let r2 = if ss_tot == 0.0 { 1.0 } else { 1.0 - ss_res / ss_tot };

    Metrics {
        mae,
        rmse,
        r2,
        evaluated_on: split,
    }
}

/// Copy `columns` of `df` into a row-major `f64` matrix.
///
/// Fails with [`LearningError::InvalidData`] on an absent column, a
/// non-numeric column, or a missing cell.
pub fn frame_to_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let mut matrix = Array2::zeros((df.height(), columns.len()));

    for (j, name) in columns.iter().enumerate() {
        let column = df.column(name).map_err(|_| {
            LearningError::InvalidData(format!("feature column '{}' is missing", name))
        })?;
        if !is_numeric_dtype(column.dtype()) && column.dtype() != &DataType::Boolean {
            return Err(LearningError::InvalidData(format!(
                "feature column '{}' is not numeric ({})",
                name,
                column.dtype()
            )));
        }

        let values = column.cast(&DataType::Float64)?;
        for (i, value) in values.f64()?.into_iter().enumerate() {
            matrix[[i, j]] = value.ok_or_else(|| {
                LearningError::InvalidData(format!(
                    "feature column '{}' has a missing value at row {}",
                    name, i
                ))
            })?;
        }
    }

    Ok(matrix)
}

/// A fitted model as persisted to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub format_version: u32,

    /// Configured model name.
    pub name: String,

    /// Algorithm label, reported in prediction responses.
    pub algorithm: String,

    pub target_variable: String,

    /// Training-matrix columns, in coefficient order.
    pub feature_names: Vec<String>,

    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub alpha: f64,

    pub metrics: Metrics,

    /// RFC 3339 UTC timestamp of the training run.
    pub trained_at: String,
}

static_assertions::assert_impl_all!(TrainedModel: Send, Sync);

impl TrainedModel {
    /// Predict one value per row of `df`, selecting features by name.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let x = frame_to_matrix(df, &self.feature_names)?;
        Ok(self.predict_matrix(&x).to_vec())
    }

    /// Predict from a matrix whose columns follow [`feature_names`](Self::feature_names).
    pub fn predict_matrix(&self, x: &Array2<f64>) -> Array1<f64> {
        let coefficients = Array1::from(self.coefficients.clone());
        x.dot(&coefficients) + self.intercept
    }

    /// `|coefficient|` per feature, normalised to sum to 1, highest first.
    ///
    /// All scores are zero when every coefficient is zero.
    pub fn feature_importance(&self) -> Vec<(String, f64)> {
        let total: f64 = self.coefficients.iter().map(|c| c.abs()).sum();
        let mut importance: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .zip(&self.coefficients)
            .map(|(name, coef)| {
                let score = if total > 0.0 { coef.abs() / total } else { 0.0 };
                (name.clone(), score)
            })
            .collect();
        importance.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        importance
    }

    /// Write the model as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json)?;
        debug!("Saved model '{}' to {}", self.name, path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LearningError::artifact_load(path, "file not found"));
        }

        let bytes = std::fs::read(path).map_err(|e| LearningError::artifact_load(path, e))?;
        let model: TrainedModel =
            serde_json::from_slice(&bytes).map_err(|e| LearningError::artifact_load(path, e))?;

        if model.format_version != MODEL_FORMAT_VERSION {
            return Err(LearningError::artifact_load(
                path,
                format!(
                    "unsupported format version {} (expected {})",
                    model.format_version, MODEL_FORMAT_VERSION
                ),
            ));
        }
        if model.coefficients.len() != model.feature_names.len() {
            return Err(LearningError::artifact_load(
                path,
                format!(
                    "{} coefficients for {} features",
                    model.coefficients.len(),
                    model.feature_names.len()
                ),
            ));
        }
        if model.metrics.r2 < 0.0 {
            warn!(
                "Model '{}' scored R² = {:.4}; predictions may be worse than the mean",
                model.name, model.metrics.r2
            );
        }

        Ok(model)
    }
}
