//! Inference: request validation, the [`Predictor`], and process-wide state.
//!
//! A prediction derives the same features the training table had
//! (`house_age` from the clock, `bed_bath_ratio`, and `price_per_sqft` fixed
//! at `0` because no price is known), applies the fitted column transform
//! without refitting, and evaluates the model.
//!
//! Services load the artifacts once with [`initialize`] and reach them via
//! [`predictor`]:
//!
//! ```rust,ignore
//! homeval_learning::initialize(
//!     "models/trained/house_price_model.json",
//!     "models/trained/preprocessor.json",
//! )?;
//!
//! let response = homeval_learning::predictor()?.predict(&request)?;
//! ```

use crate::error::{LearningError, Result};
use crate::model::TrainedModel;
use crate::types::{HealthStatus, PredictionRequest, PredictionResponse};
use homeval_processing::{Clock, FittedTransform, ProcessingError, SystemClock, create_features};
use once_cell::sync::OnceCell;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Earliest accepted `year_built`.
pub const MIN_YEAR_BUILT: i32 = 1800;
/// Latest accepted `year_built`.
pub const MAX_YEAR_BUILT: i32 = 2023;
/// Half-width of the confidence band as a fraction of the prediction.
pub const CONFIDENCE_MARGIN: f64 = 0.10;

static PREDICTOR: OnceCell<Predictor> = OnceCell::new();

impl PredictionRequest {
    /// Check every field constraint, reporting all violations at once.
    pub fn validate(&self) -> Result<()> {
        let mut violations = Vec::new();

        if !(self.sqft > 0.0) {
            violations.push(format!("sqft must be greater than 0 (got {})", self.sqft));
        }
        if self.bedrooms < 1 {
            violations.push(format!("bedrooms must be at least 1 (got {})", self.bedrooms));
        }
        if !(self.bathrooms > 0.0) {
            violations.push(format!(
                "bathrooms must be greater than 0 (got {})",
                self.bathrooms
            ));
        }
        if !(MIN_YEAR_BUILT..=MAX_YEAR_BUILT).contains(&self.year_built) {
            violations.push(format!(
                "year_built must be between {} and {} (got {})",
                MIN_YEAR_BUILT, MAX_YEAR_BUILT, self.year_built
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(LearningError::InvalidRequest(violations))
        }
    }
}

fn requests_to_frame(requests: &[PredictionRequest]) -> Result<DataFrame> {
    let df = df![
        "sqft" => requests.iter().map(|r| r.sqft).collect::<Vec<_>>(),
        "bedrooms" => requests.iter().map(|r| r.bedrooms).collect::<Vec<_>>(),
        "bathrooms" => requests.iter().map(|r| r.bathrooms).collect::<Vec<_>>(),
        "location" => requests.iter().map(|r| r.location.as_str()).collect::<Vec<_>>(),
        "year_built" => requests.iter().map(|r| i64::from(r.year_built)).collect::<Vec<_>>(),
        "condition" => requests.iter().map(|r| r.condition.as_str()).collect::<Vec<_>>(),
    ]?;
    Ok(df)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Owns the loaded model and fitted column transform.
///
/// Both are immutable after load, so a `Predictor` can be shared across
/// threads without locking.
pub struct Predictor {
    model: TrainedModel,
    transform: FittedTransform,
    clock: Arc<dyn Clock>,
}

static_assertions::assert_impl_all!(Predictor: Send, Sync);

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("model", &self.model.name)
            .field("algorithm", &self.model.algorithm)
            .field("features", &self.model.feature_names.len())
            .finish()
    }
}

impl Predictor {
    /// Load the model and preprocessor artifacts.
    ///
    /// Fails with [`LearningError::ArtifactLoad`] if either file is absent
    /// or cannot be decoded.
    pub fn load(model_path: impl AsRef<Path>, preprocessor_path: impl AsRef<Path>) -> Result<Self> {
        let model = TrainedModel::load(model_path.as_ref())?;
        let transform = FittedTransform::load(preprocessor_path.as_ref()).map_err(|e| match e {
            ProcessingError::ArtifactLoad { path, reason } => {
                LearningError::ArtifactLoad { path, reason }
            }
            other => LearningError::Processing(other),
        })?;

        info!(
            "Loaded model '{}' ({}) and preprocessor with {} outputs",
            model.name,
            model.algorithm,
            transform.output_width()
        );
        Ok(Self::from_parts(model, transform))
    }

    /// Build a predictor from already-loaded artifacts.
    pub fn from_parts(model: TrainedModel, transform: FittedTransform) -> Self {
        Self {
            model,
            transform,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for `house_age` and response timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn transform(&self) -> &FittedTransform {
        &self.transform
    }

    /// Value a single house.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let start_time = Instant::now();

        let price = round2(self.raw_predictions(std::slice::from_ref(request))?[0]);
        let confidence_interval = [
            round2(price * (1.0 - CONFIDENCE_MARGIN)),
            round2(price * (1.0 + CONFIDENCE_MARGIN)),
        ];
        let features_importance: BTreeMap<String, f64> =
            self.model.feature_importance().into_iter().collect();

        Ok(PredictionResponse {
            predicted_price: price,
            confidence_interval,
            features_importance,
            prediction_time: self.clock.now().to_rfc3339(),
            prediction_duration: start_time.elapsed().as_secs_f64(),
            model: self.model.algorithm.clone(),
        })
    }

    /// Value several houses, each rounded to 2 decimal places.
    ///
    /// Every request is validated first; one invalid request fails the batch.
    pub fn predict_batch(&self, requests: &[PredictionRequest]) -> Result<Vec<f64>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .raw_predictions(requests)?
            .into_iter()
            .map(round2)
            .collect())
    }

    fn raw_predictions(&self, requests: &[PredictionRequest]) -> Result<Vec<f64>> {
        for request in requests {
            request.validate()?;
        }

        let frame = requests_to_frame(requests)?;
        let features = create_features(&frame, self.clock.as_ref())?;
        let matrix = self.transform.transform(&features)?;
        debug!(
            "Scoring {} rows x {} features",
            matrix.height(),
            matrix.width()
        );
        self.model.predict(&matrix)
    }
}

/// Load the artifacts into process-wide state.
///
/// The first successful call wins; later calls return the already-loaded
/// predictor without touching the filesystem. A failed call leaves the state
/// unset.
pub fn initialize(
    model_path: impl AsRef<Path>,
    preprocessor_path: impl AsRef<Path>,
) -> Result<&'static Predictor> {
    PREDICTOR.get_or_try_init(|| Predictor::load(model_path, preprocessor_path))
}

/// The process-wide predictor, or [`LearningError::NotInitialized`].
pub fn predictor() -> Result<&'static Predictor> {
    PREDICTOR.get().ok_or(LearningError::NotInitialized)
}

#[must_use]
pub fn is_initialized() -> bool {
    PREDICTOR.get().is_some()
}

/// Liveness report; `status` is always `"healthy"`.
pub fn health() -> HealthStatus {
    HealthStatus {
        status: "healthy".to_string(),
        model_loaded: is_initialized(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Trainer;
    use homeval_processing::{FeaturePipeline, FixedClock};
    use pretty_assertions::assert_eq;

    fn request() -> PredictionRequest {
        PredictionRequest {
            sqft: 1500.0,
            bedrooms: 3,
            bathrooms: 2.0,
            location: "Leeds".to_string(),
            year_built: 2000,
            condition: "Good".to_string(),
        }
    }

    fn fitted_predictor() -> Predictor {
        let clock = Arc::new(FixedClock::at_year(2025));
        let houses = df![
            "price" => [300_000.0, 450_000.0, 250_000.0, 380_000.0, 520_000.0, 210_000.0, 330_000.0, 410_000.0],
            "sqft" => [1500.0, 1800.0, 1000.0, 1650.0, 2200.0, 900.0, 1400.0, 1900.0],
            "bedrooms" => [3i64, 4, 2, 3, 5, 2, 3, 4],
            "bathrooms" => [2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 2.5],
            "year_built" => [2000i64, 1990, 2010, 1985, 2015, 1960, 2005, 1999],
            "location" => ["Leeds", "York", "Leeds", "York", "Leeds", "York", "Leeds", "York"],
            "condition" => ["Good", "Fair", "Good", "Excellent", "Excellent", "Fair", "Good", "Good"],
        ]
        .unwrap();

        let features = FeaturePipeline::builder()
            .clock(clock.clone())
            .build()
            .process(&houses, None)
            .unwrap();
        let (model, _) = Trainer::builder().build().train(&features.data).unwrap();

        Predictor::from_parts(model, features.transform).with_clock(clock)
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_every_violation_reported() {
        let bad = PredictionRequest {
            sqft: 0.0,
            bedrooms: 0,
            bathrooms: -1.0,
            year_built: 2024,
            ..request()
        };

        match bad.validate().unwrap_err() {
            LearningError::InvalidRequest(violations) => {
                assert_eq!(violations.len(), 4);
                assert!(violations[0].starts_with("sqft"));
                assert!(violations[3].starts_with("year_built"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_year_bounds_inclusive() {
        for year in [MIN_YEAR_BUILT, MAX_YEAR_BUILT] {
            let req = PredictionRequest {
                year_built: year,
                ..request()
            };
            assert!(req.validate().is_ok());
        }
        let req = PredictionRequest {
            year_built: 1799,
            ..request()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_confidence_band_is_ten_percent() {
        let response = fitted_predictor().predict(&request()).unwrap();
        let p = response.predicted_price;

        assert_eq!(response.confidence_interval, [round2(p * 0.9), round2(p * 1.1)]);
        assert_eq!(response.model, "Ridge");
        assert!(response.prediction_duration >= 0.0);
        assert!(response.prediction_time.starts_with("2025-01-01T"));
    }

    #[test]
    fn test_batch_matches_single() {
        let predictor = fitted_predictor();
        let other = PredictionRequest {
            sqft: 2100.0,
            location: "Bristol".to_string(),
            ..request()
        };

        let batch = predictor.predict_batch(&[request(), other]).unwrap();
        let single = predictor.predict(&request()).unwrap().predicted_price;

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], single);
        assert!(predictor.predict_batch(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_request_fails_batch() {
        let bad = PredictionRequest {
            bedrooms: 0,
            ..request()
        };
        let err = fitted_predictor().predict_batch(&[request(), bad]).unwrap_err();
        assert!(matches!(err, LearningError::InvalidRequest(_)));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(123.456), 123.46);
        assert_eq!(round2(99.994), 99.99);
    }
}
