//! Configuration management for the CLI
//!
//! Settings come from an optional TOML file and `LUMEN_`-prefixed
//! environment variables (`LUMEN_TRAINING__MIN_SAMPLES=80`,
//! `LUMEN_EXPORT__DEVICE_TOKEN=...`). Command-line flags are applied on top
//! by the caller; `lumen train --model` also reads `LUMEN_MODEL_PATH`, the
//! variable the server loads its artifact from.

use anyhow::{Context, Result};
use lumen_lib::exporter::ExportConfig;
use lumen_lib::pipeline::TrainingConfig;
use serde::Deserialize;
use std::path::Path;

/// Read when `--config` is not given and the file exists
const DEFAULT_CONFIG_FILE: &str = "lumen.toml";

/// CLI settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub training: TrainingConfig,
    pub export: ExportConfig,
}

impl Settings {
    /// Load settings from the given file (or `lumen.toml`) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_sources(path, environment())
    }

    fn from_sources(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::new(DEFAULT_CONFIG_FILE, config::FileFormat::Toml).required(false),
        };

        config::Config::builder()
            .add_source(file)
            .add_source(env)
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("LUMEN")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("export.keys")
}
