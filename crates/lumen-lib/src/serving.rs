//! Lazily loaded model and request handling for the prediction service

use crate::error::ServingError;
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::pipeline::{output_level, ModelArtifact};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// A prediction answered by the store
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Response field name
    pub label: String,
    pub inputs: Vec<(String, f64)>,
    pub level: i64,
}

/// Holds the model artifact once it has been read from disk.
///
/// The first caller of [`ModelStore::get_or_load`] reads the artifact;
/// concurrent callers wait for that same load. A failed load leaves the
/// store empty so the next request tries again.
pub struct ModelStore {
    path: PathBuf,
    cell: OnceCell<Arc<ModelArtifact>>,
    logger: StructuredLogger,
    metrics: ServiceMetrics,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>, logger: StructuredLogger) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
            logger,
            metrics: ServiceMetrics::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get_or_load(&self) -> Result<Arc<ModelArtifact>, ServingError> {
        self.cell
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    async fn load(&self) -> Result<Arc<ModelArtifact>, ServingError> {
        let path = self.path.display().to_string();

        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %path, error = %e, "Model artifact not readable");
                self.metrics.inc_model_load_failures();
                return Err(ServingError::ModelUnavailable);
            }
        };

        match ModelArtifact::from_slice(&bytes) {
            Ok(artifact) => {
                self.logger.log_model_loaded(
                    &path,
                    artifact.forest.n_trees(),
                    &artifact.feature_names,
                );
                self.metrics.set_model_loaded(true);
                Ok(Arc::new(artifact))
            }
            Err(e) => {
                self.logger.log_model_load_failed(&path, &e.to_string());
                self.metrics.inc_model_load_failures();
                Err(ServingError::ModelUnavailable)
            }
        }
    }

    /// Answer one request body such as `{"ldr": 812, "motion": 1}`.
    ///
    /// The model is loaded before the body is looked at, so a missing
    /// model is reported even for a malformed request.
    pub async fn predict(&self, body: &Value) -> Result<Prediction, ServingError> {
        let artifact = self.get_or_load().await?;

        let fields = body
            .as_object()
            .ok_or_else(|| ServingError::BadInput("request body must be a JSON object".into()))?;

        let inputs = artifact
            .feature_names
            .iter()
            .map(|name| {
                let value = match fields.get(name) {
                    None => 0.0,
                    Some(v) => request_value(name, v)?,
                };
                Ok((name.clone(), value))
            })
            .collect::<Result<Vec<_>, ServingError>>()?;

        let features: Vec<f64> = inputs.iter().map(|(_, v)| *v).collect();
        if features.len() != artifact.forest.n_features() {
            return Err(ServingError::Internal(format!(
                "model expects {} features, artifact lists {}",
                artifact.forest.n_features(),
                features.len()
            )));
        }

        let raw = artifact
            .forest
            .predict(&features)
            .map_err(|e| ServingError::Internal(format!("prediction failed: {}", e)))?;
        Ok(Prediction {
            label: artifact.label_name.clone(),
            inputs,
            level: output_level(raw, artifact.output_range),
        })
    }
}

/// Coerce one request field: numbers, numeric strings and booleans
fn request_value(name: &str, value: &Value) -> Result<f64, ServingError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).ok_or_else(|| {
        ServingError::BadInput(format!("could not convert {} to a number: {}", name, value))
    })
}
