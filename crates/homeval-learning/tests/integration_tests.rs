//! Integration tests for training and inference.
//!
//! These tests train on CSV fixtures, persist artifacts to temporary
//! directories, and load them back for prediction.

use homeval_learning::{
    Algorithm, EvaluationSplit, LearningError, PredictionRequest, Predictor, TrainedModel,
    TrainingConfig, health, initialize, is_initialized, predictor, train_model,
};
use homeval_processing::{FixedClock, ProcessorConfig, process_data, run_feature_engineering};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

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

/// Run clean → features → train under `dir`; returns (model, preprocessor) paths.
fn build_artifacts(dir: &Path) -> (PathBuf, PathBuf) {
    let cleaned = dir.join("processed/cleaned_house_data.csv");
    let features = dir.join("processed/engineered_features.csv");
    let preprocessor = dir.join("models/trained/preprocessor.json");
    let model = dir.join("models/trained/house_price_model.json");

    process_data(
        fixtures_path().join("house_data.csv"),
        &cleaned,
        &ProcessorConfig::default(),
    )
    .unwrap();
    run_feature_engineering(
        &cleaned,
        &features,
        &preprocessor,
        Arc::new(FixedClock::at_year(2025)),
    )
    .unwrap();
    train_model(&features, &model, &TrainingConfig::default()).unwrap();

    (model, preprocessor)
}

// ============================================================================
// Training
// ============================================================================

#[test]
fn test_train_exactly_linear_data() {
    let dir = tempdir().unwrap();
    let model_path = dir.path().join("trained/linear.json");
    let config = TrainingConfig::builder()
        .name("linear")
        .algorithm(Algorithm::LinearRegression)
        .build()
        .unwrap();

    let result = train_model(fixtures_path().join("linear_houses.csv"), &model_path, &config)
        .unwrap();

    assert!(result.metrics.r2 > 0.9999, "r2 = {}", result.metrics.r2);
    assert_eq!(result.metrics.evaluated_on, EvaluationSplit::Test);
    assert_eq!((result.train_rows, result.test_rows), (24, 6));
    assert_eq!(result.algorithm, "LinearRegression");

    let total: f64 = result.feature_importance.iter().map(|(_, s)| s).sum();
    assert!((total - 1.0).abs() < 1e-9);

    let model = TrainedModel::load(&model_path).unwrap();
    assert_eq!(
        model.feature_names,
        vec!["sqft", "bedrooms", "bathrooms", "house_age"]
    );
    assert!((model.coefficients[0] - 120.0).abs() < 1e-3);
    assert!((model.intercept - 25_000.0).abs() < 1.0);
}

#[test]
fn test_train_is_reproducible_for_a_seed() {
    let dir = tempdir().unwrap();
    let config = TrainingConfig::default();
    let data = fixtures_path().join("linear_houses.csv");

    let first = train_model(&data, dir.path().join("a.json"), &config).unwrap();
    let second = train_model(&data, dir.path().join("b.json"), &config).unwrap();

    assert_eq!(first.metrics, second.metrics);
    assert_eq!(
        TrainedModel::load(dir.path().join("a.json")).unwrap().coefficients,
        TrainedModel::load(dir.path().join("b.json")).unwrap().coefficients
    );
}

#[test]
fn test_train_from_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("model_config.toml");
    std::fs::write(
        &config_path,
        "[model]\n\
         name = \"house_price_model\"\n\
         best_model = \"Ridge\"\n\
         target_variable = \"price\"\n\
         \n\
         [model.parameters]\n\
         alpha = 0.5\n",
    )
    .unwrap();

    let config = TrainingConfig::from_file(&config_path).unwrap();
    let model_path = dir.path().join("trained").join(format!("{}.json", config.name));
    train_model(fixtures_path().join("linear_houses.csv"), &model_path, &config).unwrap();

    let model = TrainedModel::load(&model_path).unwrap();
    assert_eq!(model.alpha, 0.5);
    assert_eq!(model.algorithm, "Ridge");
}

#[test]
fn test_train_missing_target_writes_nothing() {
    let dir = tempdir().unwrap();
    let model_path = dir.path().join("model.json");
    let config = TrainingConfig::builder()
        .target_variable("sale_price")
        .build()
        .unwrap();

    let err =
        train_model(fixtures_path().join("linear_houses.csv"), &model_path, &config).unwrap_err();

    assert!(matches!(err, LearningError::TargetNotFound(ref t) if t == "sale_price"));
    assert!(!model_path.exists());
}

#[test]
fn test_train_on_raw_strings_is_invalid_data() {
    let dir = tempdir().unwrap();
    let err = train_model(
        fixtures_path().join("house_data.csv"),
        dir.path().join("model.json"),
        &TrainingConfig::default(),
    )
    .unwrap_err();

    assert!(matches!(err, LearningError::InvalidData(_)));
}

// ============================================================================
// Inference
// ============================================================================

#[test]
fn test_end_to_end_prediction() {
    let dir = tempdir().unwrap();
    let (model, preprocessor) = build_artifacts(dir.path());

    let predictor = Predictor::load(&model, &preprocessor)
        .unwrap()
        .with_clock(Arc::new(FixedClock::at_year(2025)));
    let response = predictor.predict(&request()).unwrap();
    let p = response.predicted_price;

    assert!(p.is_finite());
    assert_eq!(p, (p * 100.0).round() / 100.0);
    let [low, high] = response.confidence_interval;
    assert_eq!(low, ((p * 0.9) * 100.0).round() / 100.0);
    assert_eq!(high, ((p * 1.1) * 100.0).round() / 100.0);
    assert_eq!(response.model, "Ridge");
    assert_eq!(response.features_importance.len(), 13);
}

#[test]
fn test_unseen_location_predicts() {
    let dir = tempdir().unwrap();
    let (model, preprocessor) = build_artifacts(dir.path());
    let predictor = Predictor::load(&model, &preprocessor).unwrap();

    let unseen = PredictionRequest {
        location: "Bristol".to_string(),
        condition: "Derelict".to_string(),
        ..request()
    };
    let prices = predictor.predict_batch(&[request(), unseen]).unwrap();

    assert_eq!(prices.len(), 2);
    assert!(prices.iter().all(|p| p.is_finite()));
}

#[test]
fn test_invalid_request_rejected() {
    let dir = tempdir().unwrap();
    let (model, preprocessor) = build_artifacts(dir.path());
    let predictor = Predictor::load(&model, &preprocessor).unwrap();

    let bad = PredictionRequest {
        sqft: -5.0,
        year_built: 1700,
        ..request()
    };
    match predictor.predict(&bad).unwrap_err() {
        LearningError::InvalidRequest(violations) => assert_eq!(violations.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_load_missing_artifacts() {
    let dir = tempdir().unwrap();
    let (model, preprocessor) = build_artifacts(dir.path());

    let err = Predictor::load(dir.path().join("absent.json"), &preprocessor).unwrap_err();
    assert!(matches!(err, LearningError::ArtifactLoad { .. }));

    let err = Predictor::load(&model, dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, LearningError::ArtifactLoad { .. }));
}

#[test]
fn test_load_corrupt_model() {
    let dir = tempdir().unwrap();
    let (_, preprocessor) = build_artifacts(dir.path());
    let corrupt = dir.path().join("corrupt.json");
    std::fs::write(&corrupt, "{ not json").unwrap();

    let err = Predictor::load(&corrupt, &preprocessor).unwrap_err();
    assert!(matches!(err, LearningError::ArtifactLoad { .. }));
}

// ============================================================================
// Process-wide State
// ============================================================================

// The only test that touches the process-wide predictor.
#[test]
fn test_initialize_is_load_once() {
    assert!(matches!(predictor().unwrap_err(), LearningError::NotInitialized));
    assert!(!health().model_loaded);
    assert_eq!(health().status, "healthy");

    let dir = tempdir().unwrap();
    let err = initialize(dir.path().join("absent.json"), dir.path().join("absent.json"));
    assert!(err.is_err());
    assert!(!is_initialized());

    let (model, preprocessor) = build_artifacts(dir.path());
    let first = initialize(&model, &preprocessor).unwrap();
    assert!(health().model_loaded);

    // Later calls are no-ops, even with paths that would fail to load.
    let second = initialize(dir.path().join("absent.json"), &preprocessor).unwrap();
    assert!(std::ptr::eq(first, second));
    assert!(std::ptr::eq(first, predictor().unwrap()));

    assert!(predictor().unwrap().predict(&request()).is_ok());
}
