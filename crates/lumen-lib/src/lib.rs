//! Core library for the Lumen LED prediction pipeline
//!
//! This crate provides the core functionality for:
//! - Exporting sensor telemetry from a remote time-series store
//! - Cleaning, validating and de-outliering the exported history
//! - Training a random-forest regressor and persisting it
//! - Serving predictions from a lazily loaded model
//! - Metrics and structured logging

pub mod error;
pub mod exporter;
pub mod forest;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod serving;

pub use error::{ExportError, PipelineError, ServingError};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use serving::{ModelStore, Prediction};
