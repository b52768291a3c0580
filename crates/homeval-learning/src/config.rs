//! Configuration types for model training.
//!
//! [`TrainingConfig`] is built with [`TrainingConfig::builder()`] or read from
//! a TOML, JSON or YAML file whose keys live under a `[model]` table:
//!
//! ```toml
//! [model]
//! name = "house_price_model"
//! best_model = "Ridge"
//! target_variable = "price"
//!
//! [model.parameters]
//! alpha = 1.0
//! ```

use crate::error::{LearningError, Result};
use homeval_processing::ConfigFormat;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The regression algorithm to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum Algorithm {
    /// L2-regularised least squares.
    #[default]
    Ridge,

    /// Ordinary least squares (ridge with `alpha = 0`).
    LinearRegression,
}

impl Algorithm {
    /// Returns the label stored in model artifacts and prediction responses.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Ridge => "Ridge",
            Algorithm::LinearRegression => "LinearRegression",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Ridge" | "ridge" => Ok(Algorithm::Ridge),
            "LinearRegression" | "linear_regression" => Ok(Algorithm::LinearRegression),
            other => Err(LearningError::InvalidConfig(format!(
                "Unsupported model: '{}'. Valid values are: Ridge, LinearRegression",
                other
            ))),
        }
    }
}

/// Configuration for a training run.
///
/// # Validation
///
/// [`build()`](TrainingConfigBuilder::build) checks that:
/// - `name` and `target_variable` are non-empty
/// - `test_size` is in `(0.0, 1.0)` (exclusive)
/// - `alpha` is finite and non-negative
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Model name; the artifact is saved as `<models_dir>/trained/<name>.json`.
    pub name: String,

    pub algorithm: Algorithm,

    /// Column holding the value to predict (default: `"price"`).
    pub target_variable: String,

    /// Fraction of rows held out for evaluation (default: 0.2).
    pub test_size: f64,

    /// Seed for the train/test shuffle (default: 42).
    pub random_seed: u64,

    /// L2 penalty (default: 1.0). Ignored for [`Algorithm::LinearRegression`].
    pub alpha: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            name: "house_price_model".to_string(),
            algorithm: Algorithm::default(),
            target_variable: "price".to_string(),
            test_size: 0.2,
            random_seed: 42,
            alpha: 1.0,
        }
    }
}

impl TrainingConfig {
    #[must_use]
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// The penalty actually applied by the solver.
    #[must_use]
    pub fn effective_alpha(&self) -> f64 {
        match self.algorithm {
            Algorithm::Ridge => self.alpha,
            Algorithm::LinearRegression => 0.0,
        }
    }

    /// Load a configuration file (JSON or YAML by extension, otherwise TOML).
    ///
    /// Keys missing from the `[model]` table take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |reason: String| {
            LearningError::InvalidConfig(format!("{}: {}", path.display(), reason))
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let file: TrainingConfigFile = ConfigFormat::from_path(path)
            .parse(&content)
            .map_err(load_error)?;
        let model = file.model;

        let mut builder = Self::builder();
        if let Some(name) = model.name {
            builder = builder.name(name);
        }
        if let Some(best_model) = model.best_model {
            builder = builder.algorithm(best_model.parse()?);
        }
        if let Some(target) = model.target_variable {
            builder = builder.target_variable(target);
        }
        if let Some(test_size) = model.test_size {
            builder = builder.test_size(test_size);
        }
        if let Some(seed) = model.random_seed {
            builder = builder.random_seed(seed);
        }
        if let Some(alpha) = model.parameters.alpha {
            builder = builder.alpha(alpha);
        }

        builder.build()
    }
}

#[derive(Debug, Deserialize)]
struct TrainingConfigFile {
    model: ModelSection,
}

#[derive(Debug, Default, Deserialize)]
struct ModelSection {
    name: Option<String>,
    best_model: Option<String>,
    target_variable: Option<String>,
    test_size: Option<f64>,
    random_seed: Option<u64>,
    #[serde(default)]
    parameters: ModelParameters,
}

#[derive(Debug, Default, Deserialize)]
struct ModelParameters {
    alpha: Option<f64>,
}

/// Builder for [`TrainingConfig`].
#[derive(Debug, Clone, Default)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    #[must_use]
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    #[must_use]
    pub fn target_variable(mut self, column: impl Into<String>) -> Self {
        self.config.target_variable = column.into();
        self
    }

    #[must_use]
    pub fn test_size(mut self, size: f64) -> Self {
        self.config.test_size = size;
        self
    }

    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    #[must_use]
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.config.alpha = alpha;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if any validation fails.
    pub fn build(self) -> Result<TrainingConfig> {
        if self.config.name.trim().is_empty() {
            return Err(LearningError::InvalidConfig(
                "name cannot be empty".to_string(),
            ));
        }

        if self.config.target_variable.trim().is_empty() {
            return Err(LearningError::InvalidConfig(
                "target_variable cannot be empty".to_string(),
            ));
        }

        if !(self.config.test_size > 0.0 && self.config.test_size < 1.0) {
            return Err(LearningError::InvalidConfig(
                "test_size must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }

        if !self.config.alpha.is_finite() || self.config.alpha < 0.0 {
            return Err(LearningError::InvalidConfig(
                "alpha must be a non-negative finite number".to_string(),
            ));
        }

        Ok(self.config)
    }
}
