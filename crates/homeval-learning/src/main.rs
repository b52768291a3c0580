//! CLI entry point for house-price model training and prediction.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use homeval_learning::{PredictionRequest, Predictor, TrainingConfig, train_model};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "House-price model training and prediction",
    long_about = "Trains a regression model on the engineered feature matrix and \
                  serves predictions from the saved artifacts.\n\n\
                  EXAMPLES:\n  \
                  # Train and save to models/trained/<name>.json\n  \
                  homeval-learning train --config configs/model_config.toml \
                  --data data/processed/engineered_features.csv --models-dir models\n\n  \
                  # Value a single house\n  \
                  homeval-learning predict --model models/trained/house_price_model.json \
                  --preprocessor models/trained/preprocessor.json --request house.json"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a model and save it under <models-dir>/trained/
    Train {
        /// Training configuration file (TOML, JSON or YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Engineered feature matrix CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Root directory for model artifacts
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,
    },

    /// Predict prices from a JSON request (an object or an array of objects)
    Predict {
        /// Saved model artifact
        #[arg(short, long)]
        model: PathBuf,

        /// Saved column transform artifact
        #[arg(short, long)]
        preprocessor: PathBuf,

        /// Request JSON file
        #[arg(short, long)]
        request: PathBuf,
    },
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    // Load environment variables from .env file
    dotenv().ok();

    match args.command {
        Command::Train {
            config,
            data,
            models_dir,
        } => {
            if !data.exists() {
                return Err(anyhow!("Data file not found: {}", data.display()));
            }

            let config = TrainingConfig::from_file(&config)
                .with_context(|| format!("Loading training config {}", config.display()))?;
            debug!("Training config: {:?}", config);

            let model_path = models_dir
                .join("trained")
                .join(format!("{}.json", config.name));

            let result = train_model(&data, &model_path, &config)
                .with_context(|| format!("Training on {} failed", data.display()))?;

            info!(
                "Trained {} on {} rows: MAE = {:.2}, R² = {:.4}",
                result.algorithm, result.train_rows, result.metrics.mae, result.metrics.r2
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Predict {
            model,
            preprocessor,
            request,
        } => {
            let predictor = Predictor::load(&model, &preprocessor)?;

            let content = std::fs::read_to_string(&request)
                .with_context(|| format!("Reading request {}", request.display()))?;
            let payload: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Parsing request {}", request.display()))?;

            let output = if payload.is_array() {
                let requests: Vec<PredictionRequest> = serde_json::from_value(payload)?;
                serde_json::to_string_pretty(&predictor.predict_batch(&requests)?)?
            } else {
                let request: PredictionRequest = serde_json::from_value(payload)?;
                serde_json::to_string_pretty(&predictor.predict(&request)?)?
            };
            println!("{}", output);
        }
    }

    Ok(())
}
