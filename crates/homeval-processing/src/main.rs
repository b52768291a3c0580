//! CLI entry point for the house-price processing stages.

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use homeval_processing::{
    CleaningPipeline, Clock, FeaturePipeline, FeaturesConfig, FixedClock, OutlierPolicy,
    ProcessorConfig, SystemClock, TransformMode,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// CLI-compatible outlier policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutlierPolicy {
    /// Remove rows outside the IQR bounds
    Filter,
    /// Cap values at the IQR bounds
    Clip,
    /// Keep outliers as-is
    None,
}

impl From<CliOutlierPolicy> for OutlierPolicy {
    fn from(cli: CliOutlierPolicy) -> Self {
        match cli {
            CliOutlierPolicy::Filter => OutlierPolicy::Filter,
            CliOutlierPolicy::Clip => OutlierPolicy::Clip,
            CliOutlierPolicy::None => OutlierPolicy::None,
        }
    }
}

/// CLI-compatible transform mode enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTransformMode {
    /// Fit the column transform and save it
    Fit,
    /// Load a previously saved column transform
    Reuse,
}

impl From<CliTransformMode> for TransformMode {
    fn from(cli: CliTransformMode) -> Self {
        match cli {
            CliTransformMode::Fit => TransformMode::Fit,
            CliTransformMode::Reuse => TransformMode::Reuse,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "House-price data cleaning and feature engineering",
    long_about = "Cleans raw house listings and builds the model feature matrix.\n\n\
                  EXAMPLES:\n  \
                  # Clean with the default filter policy\n  \
                  homeval-processing clean --in data/raw/house_data.csv \
                  --out data/processed/cleaned_house_data.csv\n\n  \
                  # Clip instead of dropping rows\n  \
                  homeval-processing clean --in raw.csv --out cleaned.csv --policy clip\n\n  \
                  # Build features and fit the preprocessor\n  \
                  homeval-processing features --input cleaned.csv --output features.csv"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Impute missing values and handle outliers in the target column
    Clean {
        /// Raw input CSV
        #[arg(long = "in")]
        input: PathBuf,

        /// Cleaned output CSV
        #[arg(long = "out")]
        output: PathBuf,

        /// Processor configuration file (TOML, JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Outlier policy for the target column
        #[arg(long, value_enum)]
        policy: Option<CliOutlierPolicy>,

        /// Target column name
        #[arg(short, long)]
        target: Option<String>,

        /// IQR multiplier (k)
        #[arg(long)]
        iqr_multiplier: Option<f64>,

        /// Write each row's original position as a leading `index` column
        /// (`--save-index` or `--save-index false`)
        #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
        save_index: Option<bool>,
    },

    /// Derive features and fit or apply the column transform
    Features {
        /// Cleaned input CSV
        #[arg(long)]
        input: Option<PathBuf>,

        /// Feature matrix output CSV
        #[arg(long)]
        output: Option<PathBuf>,

        /// Column transform artifact path
        #[arg(long)]
        preprocessor: Option<PathBuf>,

        /// Features configuration file (TOML, JSON or YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fit a new transform or reuse the saved one
        #[arg(long, value_enum, default_value = "fit")]
        mode: CliTransformMode,

        /// Compute `house_age` against this year instead of the current one
        #[arg(long)]
        current_year: Option<i32>,
    },
}

fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// CLI flags take precedence over file values.
fn apply_clean_overrides(
    base: ProcessorConfig,
    policy: Option<CliOutlierPolicy>,
    target: Option<String>,
    iqr_multiplier: Option<f64>,
    save_index: Option<bool>,
) -> Result<ProcessorConfig> {
    let mut builder = base.to_builder();
    if let Some(policy) = policy {
        builder = builder.outlier_policy(policy.into());
    }
    if let Some(target) = target {
        builder = builder.target(target);
    }
    if let Some(k) = iqr_multiplier {
        builder = builder.iqr_multiplier(k);
    }
    if let Some(save_index) = save_index {
        builder = builder.save_index(save_index);
    }
    Ok(builder.build()?)
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet);

    // Load environment variables from .env file
    dotenv().ok();

    match args.command {
        Command::Clean {
            input,
            output,
            config,
            policy,
            target,
            iqr_multiplier,
            save_index,
        } => {
            if !input.exists() {
                return Err(anyhow!("Input file not found: {}", input.display()));
            }

            let base = match &config {
                Some(path) => ProcessorConfig::from_file(path)?,
                None => ProcessorConfig::default(),
            };

            let config = apply_clean_overrides(base, policy, target, iqr_multiplier, save_index)?;
            debug!("Processor config: {:?}", config);

            let result = CleaningPipeline::builder()
                .config(config)
                .on_progress(|update| {
                    debug!("[{:.0}%] {}", update.progress * 100.0, update.message);
                })
                .build()?
                .run(&input, &output)
                .with_context(|| format!("Cleaning {} failed", input.display()))?;

            info!(
                "Cleaned {} -> {} rows ({} cells imputed), written to {}",
                result.summary.rows_before,
                result.summary.rows_after,
                result.summary.cells_imputed,
                output.display()
            );
        }

        Command::Features {
            input,
            output,
            preprocessor,
            config,
            mode,
            current_year,
        } => {
            let mut features_config = match &config {
                Some(path) => FeaturesConfig::from_file(path)?,
                None => FeaturesConfig::default(),
            };
            if let Some(input) = input {
                features_config.input = input;
            }
            if let Some(output) = output {
                features_config.output = output;
            }
            if let Some(preprocessor) = preprocessor {
                features_config.preprocessor = preprocessor;
            }

            let clock: Arc<dyn Clock> = match current_year {
                Some(year) => Arc::new(FixedClock::at_year(year)),
                None => Arc::new(SystemClock),
            };

            let result = FeaturePipeline::builder()
                .clock(clock)
                .on_progress(|update| {
                    debug!("[{:.0}%] {}", update.progress * 100.0, update.message);
                })
                .build()
                .run(&features_config, mode.into())
                .with_context(|| {
                    format!("Feature engineering on {} failed", features_config.input.display())
                })?;

            info!(
                "Wrote {} rows x {} features to {}",
                result.summary.rows,
                result.summary.feature_names.len(),
                features_config.output.display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_flags(extra: &[&str]) -> (Option<CliOutlierPolicy>, Option<bool>) {
        let mut argv = vec!["homeval-processing", "clean", "--in", "raw.csv", "--out", "out.csv"];
        argv.extend_from_slice(extra);
        match Args::try_parse_from(argv).unwrap().command {
            Command::Clean {
                policy, save_index, ..
            } => (policy, save_index),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_save_index_flag_forms() {
        assert_eq!(clean_flags(&[]).1, None);
        assert_eq!(clean_flags(&["--save-index"]).1, Some(true));
        assert_eq!(clean_flags(&["--save-index", "false"]).1, Some(false));
    }

    #[test]
    fn test_cli_can_turn_off_file_save_index() {
        let base = ProcessorConfig::builder().save_index(true).build().unwrap();
        let (policy, save_index) = clean_flags(&["--save-index=false", "--policy", "clip"]);

        let config = apply_clean_overrides(base, policy, None, None, save_index).unwrap();

        assert!(!config.save_index);
        assert_eq!(config.outlier_policy, OutlierPolicy::Clip);
    }

    #[test]
    fn test_unset_flags_keep_file_values() {
        let base = ProcessorConfig::builder().save_index(true).build().unwrap();
        let config = apply_clean_overrides(base.clone(), None, None, None, None).unwrap();
        assert_eq!(config, base);
    }
}
