//! Configuration types for the cleaning and feature stages.
//!
//! [`ProcessorConfig`] drives the cleaning stage and [`FeaturesConfig`] the
//! feature stage. Both are immutable once built: overrides (for example from
//! CLI flags) produce a new value through [`ProcessorConfig::to_builder`].
//!
//! Configuration files may be TOML, JSON or YAML; the format is picked from
//! the file extension by [`ConfigFormat::from_path`]. Keys that are absent
//! take their defaults, unknown keys are rejected.
//!
//! # Example
//!
//! ```rust,ignore
//! use homeval_processing::config::{OutlierPolicy, ProcessorConfig};
//!
//! let base = ProcessorConfig::from_file("configs/processing.toml")?;
//! let config = base.to_builder().outlier_policy(OutlierPolicy::Clip).build()?;
//! ```

use crate::error::{ProcessingError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default name of the target column.
pub const DEFAULT_TARGET: &str = "price";

/// Default Tukey whisker multiplier.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Strategy applied to outliers in the target column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutlierPolicy {
    /// Remove rows whose value lies outside the IQR bounds
    #[default]
    Filter,
    /// Cap values at the IQR bounds
    Clip,
    /// Leave the data unchanged
    None,
}

impl OutlierPolicy {
    /// The lowercase name used in configuration files and on the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filter => "filter",
            Self::Clip => "clip",
            Self::None => "none",
        }
    }
}

impl fmt::Display for OutlierPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutlierPolicy {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "filter" => Ok(Self::Filter),
            "clip" => Ok(Self::Clip),
            "none" => Ok(Self::None),
            other => Err(ProcessingError::InvalidPolicy(other.to_string())),
        }
    }
}

/// Configuration for the cleaning stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Name of the target column; outlier handling is applied to it.
    /// Default: "price"
    pub target: String,

    /// Outlier handling policy for the target column.
    /// Default: Filter
    pub outlier_policy: OutlierPolicy,

    /// Whisker width multiplier for IQR bounds. Must be finite and >= 0.
    /// Default: 1.5
    pub iqr_multiplier: f64,

    /// Whether to write each row's original position as a leading `index`
    /// column in the cleaned CSV.
    /// Default: false
    pub save_index: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            outlier_policy: OutlierPolicy::default(),
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            save_index: false,
        }
    }
}

impl ProcessorConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::default()
    }

    /// A builder pre-populated with this configuration's values.
    ///
    /// Used to derive an overridden configuration without mutating `self`.
    pub fn to_builder(&self) -> ProcessorConfigBuilder {
        ProcessorConfigBuilder {
            target: Some(self.target.clone()),
            outlier_policy: Some(self.outlier_policy),
            iqr_multiplier: Some(self.iqr_multiplier),
            save_index: Some(self.save_index),
        }
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if self.target.trim().is_empty() {
            return Err(ConfigValidationError::EmptyTarget);
        }

        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(ConfigValidationError::InvalidMultiplier(self.iqr_multiplier));
        }

        Ok(())
    }

    /// Load a configuration file (TOML, JSON or YAML).
    ///
    /// The outlier policy is parsed with [`OutlierPolicy::from_str`], so an
    /// unrecognised value surfaces as [`ProcessingError::InvalidPolicy`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw: ProcessorConfigFile = read_config_file(path.as_ref())?;

        let mut builder = Self::builder();
        if let Some(target) = raw.target {
            builder = builder.target(target);
        }
        if let Some(policy) = raw.outlier_policy {
            builder = builder.outlier_policy(policy.parse()?);
        }
        if let Some(k) = raw.iqr_multiplier {
            builder = builder.iqr_multiplier(k);
        }
        if let Some(save_index) = raw.save_index {
            builder = builder.save_index(save_index);
        }

        Ok(builder.build()?)
    }
}

/// On-disk shape of [`ProcessorConfig`]; every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProcessorConfigFile {
    target: Option<String>,
    outlier_policy: Option<String>,
    iqr_multiplier: Option<f64>,
    save_index: Option<bool>,
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Target column name must not be empty")]
    EmptyTarget,

    #[error("Invalid IQR multiplier: {0} (must be finite and >= 0)")]
    InvalidMultiplier(f64),
}

impl From<ConfigValidationError> for ProcessingError {
    fn from(err: ConfigValidationError) -> Self {
        ProcessingError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`ProcessorConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    target: Option<String>,
    outlier_policy: Option<OutlierPolicy>,
    iqr_multiplier: Option<f64>,
    save_index: Option<bool>,
}

impl ProcessorConfigBuilder {
    /// Set the target column name.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the outlier policy.
    pub fn outlier_policy(mut self, policy: OutlierPolicy) -> Self {
        self.outlier_policy = Some(policy);
        self
    }

    /// Set the IQR multiplier (`k`).
    pub fn iqr_multiplier(mut self, k: f64) -> Self {
        self.iqr_multiplier = Some(k);
        self
    }

    /// Enable or disable writing the row index column.
    pub fn save_index(mut self, save: bool) -> Self {
        self.save_index = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ProcessorConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<ProcessorConfig, ConfigValidationError> {
        let config = ProcessorConfig {
            target: self.target.unwrap_or_else(|| DEFAULT_TARGET.to_string()),
            outlier_policy: self.outlier_policy.unwrap_or_default(),
            iqr_multiplier: self.iqr_multiplier.unwrap_or(DEFAULT_IQR_MULTIPLIER),
            save_index: self.save_index.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Configuration for the feature stage: where to read, where to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeaturesConfig {
    /// Cleaned CSV produced by the cleaning stage.
    pub input: PathBuf,
    /// Engineered feature matrix CSV.
    pub output: PathBuf,
    /// Fitted column transform artifact.
    pub preprocessor: PathBuf,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/processed/cleaned_house_data.csv"),
            output: PathBuf::from("data/processed/engineered_features.csv"),
            preprocessor: PathBuf::from("models/trained/preprocessor.json"),
        }
    }
}

impl FeaturesConfig {
    /// Load a feature-stage configuration file (TOML, JSON or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        read_config_file(path.as_ref())
    }
}

/// On-disk configuration formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// `.json` is JSON, `.yaml`/`.yml` is YAML, anything else is TOML.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("json") => ConfigFormat::Json,
            Some("yaml" | "yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        }
    }

    /// Deserialize `content`, returning the parser's message on failure.
    pub fn parse<T: DeserializeOwned>(self, content: &str) -> std::result::Result<T, String> {
        match self {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Read and deserialize a configuration file in the format its extension names.
pub(crate) fn read_config_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let load_error = |reason: String| ProcessingError::ConfigLoad {
        path: path.display().to_string(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    ConfigFormat::from_path(path)
        .parse(&content)
        .map_err(load_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ProcessorConfig::default();
        assert_eq!(config.target, "price");
        assert_eq!(config.outlier_policy, OutlierPolicy::Filter);
        assert_eq!(config.iqr_multiplier, 1.5);
        assert!(!config.save_index);
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let config = ProcessorConfig::builder().build().unwrap();
        assert_eq!(config, ProcessorConfig::default());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("filter".parse::<OutlierPolicy>().unwrap(), OutlierPolicy::Filter);
        assert_eq!("clip".parse::<OutlierPolicy>().unwrap(), OutlierPolicy::Clip);
        assert_eq!("none".parse::<OutlierPolicy>().unwrap(), OutlierPolicy::None);

        let err = "bogus".parse::<OutlierPolicy>().unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidPolicy(ref p) if p == "bogus"));
    }

    #[test]
    fn test_validation_rejects_negative_multiplier() {
        let result = ProcessorConfig::builder().iqr_multiplier(-1.0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidMultiplier(_)
        ));
    }

    #[test]
    fn test_validation_rejects_empty_target() {
        let result = ProcessorConfig::builder().target("  ").build();
        assert!(matches!(result.unwrap_err(), ConfigValidationError::EmptyTarget));
    }

    #[test]
    fn test_to_builder_overrides_without_mutating() {
        let base = ProcessorConfig::builder()
            .target("sale_price")
            .iqr_multiplier(3.0)
            .build()
            .unwrap();

        let overridden = base
            .to_builder()
            .outlier_policy(OutlierPolicy::Clip)
            .build()
            .unwrap();

        assert_eq!(base.outlier_policy, OutlierPolicy::Filter);
        assert_eq!(overridden.outlier_policy, OutlierPolicy::Clip);
        assert_eq!(overridden.target, "sale_price");
        assert_eq!(overridden.iqr_multiplier, 3.0);
    }

    #[test]
    fn test_from_toml_file() {
        let file = write_temp(
            ".toml",
            "target = \"sale_price\"\noutlier_policy = \"clip\"\niqr_multiplier = 2.0\n",
        );

        let config = ProcessorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.target, "sale_price");
        assert_eq!(config.outlier_policy, OutlierPolicy::Clip);
        assert_eq!(config.iqr_multiplier, 2.0);
        assert!(!config.save_index);
    }

    #[test]
    fn test_from_json_file() {
        let file = write_temp(".json", r#"{ "outlier_policy": "none", "save_index": true }"#);

        let config = ProcessorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.target, "price");
        assert_eq!(config.outlier_policy, OutlierPolicy::None);
        assert!(config.save_index);
    }

    #[test]
    fn test_from_yaml_file() {
        let file = write_temp(
            ".yaml",
            "target: price\noutlier_policy: clip\niqr_multiplier: 3.0\n",
        );

        let config = ProcessorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.outlier_policy, OutlierPolicy::Clip);
        assert_eq!(config.iqr_multiplier, 3.0);
        assert!(!config.save_index);
    }

    #[test]
    fn test_config_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.conf")), ConfigFormat::Toml);
    }

    #[test]
    fn test_from_file_unknown_policy() {
        let file = write_temp(".toml", "outlier_policy = \"winsorize\"\n");
        let err = ProcessorConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidPolicy(_)));
    }

    #[test]
    fn test_from_file_unknown_key() {
        let file = write_temp(".toml", "targett = \"price\"\n");
        let err = ProcessorConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ProcessingError::ConfigLoad { .. }));
    }

    #[test]
    fn test_from_missing_file() {
        let err = ProcessorConfig::from_file("/nonexistent/processing.toml").unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_LOAD_ERROR");
    }

    #[test]
    fn test_features_config_partial_file() {
        let file = write_temp(".toml", "output = \"out/features.csv\"\n");
        let config = FeaturesConfig::from_file(file.path()).unwrap();
        assert_eq!(config.output, PathBuf::from("out/features.csv"));
        assert_eq!(config.input, FeaturesConfig::default().input);
    }
}
