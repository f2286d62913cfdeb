//! Error types for the exporter, the training pipeline and the prediction service

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised by the training pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input table not found at {0:?} (run `lumen export` first)")]
    InputNotFound(PathBuf),

    #[error("failed to read input table {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("only {found} valid samples remaining, at least {required} are required")]
    InsufficientSamples { found: usize, required: usize },

    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("random forest failed: {0}")]
    Model(String),

    #[error("test R² {r2:.3} is below the configured minimum {min:.3}")]
    QualityGate { r2: f64, min: f64 },

    #[error("failed to persist model to {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode model artifact: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while exporting telemetry
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("request for key '{key}' failed: {source}")]
    Request {
        key: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("telemetry store returned {status} for key '{key}'")]
    Status {
        key: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid telemetry store URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("no telemetry downloaded for any key")]
    NoTelemetry,

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-request errors of the prediction service
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServingError {
    #[error("Model not available")]
    ModelUnavailable,

    #[error("{0}")]
    BadInput(String),

    #[error("{0}")]
    Internal(String),
}

impl ServingError {
    /// Stable label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ServingError::ModelUnavailable => "model_unavailable",
            ServingError::BadInput(_) => "bad_input",
            ServingError::Internal(_) => "internal",
        }
    }
}
