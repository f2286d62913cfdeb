//! Lumen CLI
//!
//! Exports sensor history from the telemetry store, trains the LED
//! brightness model, and queries a running prediction service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{export, service, train};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lumen CLI
#[derive(Parser)]
#[command(name = "lumen")]
#[command(author, version, about = "CLI for the Lumen LED prediction pipeline", long_about = None)]
pub struct Cli {
    /// Prediction service URL (can also be set via LUMEN_API_URL env var)
    #[arg(long, env = "LUMEN_API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// Settings file (defaults to ./lumen.toml when present)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download sensor history from the telemetry store into a CSV table
    Export {
        /// Telemetry store base URL
        #[arg(long)]
        url: Option<String>,

        /// Device access token
        #[arg(long, env = "LUMEN_DEVICE_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Telemetry keys, comma separated; the first one sets the row timestamps
        #[arg(long, value_delimiter = ',')]
        keys: Option<Vec<String>>,

        /// Number of days to look back
        #[arg(long)]
        days: Option<i64>,

        /// Output CSV path
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Clean the exported history, train the model and save it
    Train {
        /// Exported history CSV
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Where to write the model artifact (shared with the server)
        #[arg(long, short, env = "LUMEN_MODEL_PATH")]
        model: Option<PathBuf>,

        /// Refuse to save the model when test R² is below this value
        #[arg(long)]
        min_test_r2: Option<f64>,

        /// Number of trees in the forest
        #[arg(long)]
        trees: Option<usize>,

        /// Seed for the split and the forest
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Check whether the prediction service has a model loaded
    Status,

    /// Ask the prediction service for an LED level
    Predict {
        /// Light sensor reading (0-4095)
        #[arg(long)]
        ldr: f64,

        /// Motion detected (0 or 1)
        #[arg(long, default_value_t = 0.0)]
        motion: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = config::Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Export {
            url,
            token,
            keys,
            days,
            output,
        } => {
            let mut cfg = settings.export;
            if let Some(url) = url {
                cfg.base_url = url;
            }
            if let Some(token) = token {
                cfg.device_token = token;
            }
            if let Some(keys) = keys {
                cfg.keys = keys;
            }
            if let Some(days) = days {
                cfg.lookback_days = days;
            }
            if let Some(output) = output {
                cfg.output_path = output;
            }
            export::run_export(&cfg, cli.format).await?;
        }
        Commands::Train {
            input,
            model,
            min_test_r2,
            trees,
            seed,
        } => {
            let mut cfg = settings.training;
            if let Some(input) = input {
                cfg.input_path = input;
            }
            if let Some(model) = model {
                cfg.model_path = model;
            }
            if min_test_r2.is_some() {
                cfg.min_test_r2 = min_test_r2;
            }
            if let Some(trees) = trees {
                cfg.forest.n_estimators = trees;
            }
            if let Some(seed) = seed {
                cfg.split_seed = seed;
                cfg.forest.seed = seed;
            }
            train::run_training(cfg, cli.format).await?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&cli.api_url)?;
            service::show_status(&client, cli.format).await?;
        }
        Commands::Predict { ldr, motion } => {
            let client = client::ApiClient::new(&cli.api_url)?;
            service::predict(&client, ldr, motion, cli.format).await?;
        }
    }

    Ok(())
}
