//! Error types for the data processing crate.
//!
//! Every fallible operation returns [`Result<T>`], an alias over
//! [`ProcessingError`]. Errors are raised at the point of detection and
//! propagated unchanged; nothing in this crate retries or swallows a
//! correctness-affecting failure.
//!
//! Errors serialize as `{ "code": ..., "message": ... }` so an API layer can
//! forward them without knowing the variant set.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for cleaning, feature engineering and transform I/O.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// One or more required columns are absent from the table.
    ///
    /// Every missing column is listed, in the order they were requested.
    #[error("Missing required columns: {missing:?}")]
    Schema { missing: Vec<String> },

    /// An outlier policy string did not name a known policy.
    #[error("Unknown outlier policy: '{0}' (expected one of: filter, clip, none)")]
    InvalidPolicy(String),

    /// A column expected by the column transform is absent from its input.
    #[error("Missing feature column '{0}' required by the transform")]
    MissingFeature(String),

    /// A persisted artifact could not be found, read or decoded.
    #[error("Failed to load artifact '{path}': {reason}")]
    ArtifactLoad { path: String, reason: String },

    /// No non-missing values were available to compute a statistic.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// A numeric operation was requested on a non-numeric column.
    #[error("Column '{0}' is not numeric")]
    NonNumericColumn(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable machine-readable code for this error.
    ///
    /// Context wrappers report the code of the error they wrap.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "SCHEMA_ERROR",
            Self::InvalidPolicy(_) => "INVALID_POLICY",
            Self::MissingFeature(_) => "MISSING_FEATURE",
            Self::ArtifactLoad { .. } => "ARTIFACT_LOAD_ERROR",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::NonNumericColumn(_) => "NON_NUMERIC_COLUMN",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ConfigLoad { .. } => "CONFIG_LOAD_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Strip any context wrappers and return the underlying error.
    pub fn root(&self) -> &ProcessingError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Convenience constructor for [`ProcessingError::ArtifactLoad`].
    pub fn artifact_load(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        Self::ArtifactLoad {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            ProcessingError::InvalidPolicy("bogus".to_string()).error_code(),
            "INVALID_POLICY"
        );
        assert_eq!(
            ProcessingError::Schema {
                missing: vec!["price".to_string()]
            }
            .error_code(),
            "SCHEMA_ERROR"
        );
    }

    #[test]
    fn test_schema_message_lists_every_column() {
        let error = ProcessingError::Schema {
            missing: vec!["price".to_string(), "sqft".to_string()],
        };
        let message = error.to_string();
        assert!(message.contains("price"));
        assert!(message.contains("sqft"));
    }

    #[test]
    fn test_error_serialization() {
        let error = ProcessingError::MissingFeature("house_age".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("MISSING_FEATURE"));
        assert!(json.contains("house_age"));
    }

    #[test]
    fn test_with_context_preserves_code_and_root() {
        let error = ProcessingError::NoValidValues("price".to_string())
            .with_context("While computing outlier bounds");
        assert!(error.to_string().contains("While computing outlier bounds"));
        assert_eq!(error.error_code(), "NO_VALID_VALUES");
        assert!(matches!(error.root(), ProcessingError::NoValidValues(_)));
    }

    #[test]
    fn test_artifact_load_constructor() {
        let error = ProcessingError::artifact_load("models/preprocessor.json", "file not found");
        assert_eq!(error.error_code(), "ARTIFACT_LOAD_ERROR");
        assert!(error.to_string().contains("models/preprocessor.json"));
    }
}
