//! Result and payload types for training and prediction.
//!
//! Everything here derives `Serialize`/`Deserialize` so it can be written to
//! disk or handed to an API layer as-is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which split the reported metrics were computed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationSplit {
    /// The held-out rows.
    #[default]
    Test,
    /// The training rows, used when too few rows remain to hold any out.
    Train,
}

/// Regression metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean absolute error.
    pub mae: f64,

    /// Root mean squared error.
    pub rmse: f64,

    /// Coefficient of determination.
    pub r2: f64,

    pub evaluated_on: EvaluationSplit,
}

/// Output of [`train_model`](crate::train_model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TrainingResult {
    /// The configured model name.
    pub model_name: String,

    /// Algorithm label (e.g. `"Ridge"`).
    pub algorithm: String,

    pub metrics: Metrics,

    /// `(feature, score)` pairs, highest first; scores sum to 1 unless every
    /// coefficient is zero.
    pub feature_importance: Vec<(String, f64)>,

    pub train_rows: usize,
    pub test_rows: usize,

    /// Wall-clock duration of the run in seconds.
    pub training_time_seconds: f64,

    /// Non-fatal issues noticed during training.
    pub warnings: Vec<String>,
}

/// A single house to value.
///
/// Field constraints are checked by
/// [`validate()`](PredictionRequest::validate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Living area in square feet (> 0).
    pub sqft: f64,
    /// Number of bedrooms (>= 1).
    pub bedrooms: i64,
    /// Number of bathrooms (> 0).
    pub bathrooms: f64,
    pub location: String,
    /// Construction year (1800..=2023).
    pub year_built: i32,
    pub condition: String,
}

/// A single valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Predicted price rounded to 2 decimal places.
    pub predicted_price: f64,

    /// `[0.9 * price, 1.1 * price]`, each rounded to 2 decimal places.
    pub confidence_interval: [f64; 2],

    /// Per-feature scores; may be empty.
    pub features_importance: BTreeMap<String, f64>,

    /// ISO-8601 UTC timestamp.
    pub prediction_time: String,

    /// Seconds spent producing the prediction.
    pub prediction_duration: f64,

    /// Label of the model that produced the prediction.
    pub model: String,
}

/// Liveness report for the process-wide predictor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_deserializes_from_api_payload() {
        let request: PredictionRequest = serde_json::from_str(
            r#"{"sqft": 1500, "bedrooms": 3, "bathrooms": 2, "location": "Leeds",
                "year_built": 2000, "condition": "Good"}"#,
        )
        .unwrap();

        assert_eq!(request.sqft, 1500.0);
        assert_eq!(request.bedrooms, 3);
        assert_eq!(request.location, "Leeds");
    }

    #[test]
    fn test_evaluation_split_serializes_snake_case() {
        let json = serde_json::to_string(&EvaluationSplit::Train).unwrap();
        assert_eq!(json, "\"train\"");
    }
}
