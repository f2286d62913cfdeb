//! Model artifact serialization

use crate::error::PipelineError;
use crate::forest::RandomForest;
use crate::models::EvaluationMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything the prediction service needs to answer requests
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Request fields, in model input order
    pub feature_names: Vec<String>,
    /// Response field
    pub label_name: String,
    /// Predictions are clamped into this range
    pub output_range: (f64, f64),
    pub trained_at: DateTime<Utc>,
    pub metrics: EvaluationMetrics,
    pub forest: RandomForest,
}

impl ModelArtifact {
    /// Write the artifact, replacing any previous one.
    ///
    /// The bytes go to a sibling temp file first and are renamed into place,
    /// so readers never observe a partially written model.
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let bytes = serde_json::to_vec(self)?;
        let persist_err = |source| PipelineError::Persist {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(persist_err)?;
        }

        let tmp = temp_path(path);
        let mut file = fs::File::create(&tmp).map_err(persist_err)?;
        let written = file
            .write_all(&bytes)
            .and_then(|()| file.sync_all())
            .and_then(|()| {
                drop(file);
                fs::rename(&tmp, path)
            });
        if let Err(e) = written {
            // no partial artifact survives a failed save
            let _ = fs::remove_file(&tmp);
            return Err(persist_err(e));
        }

        info!(path = %path.display(), bytes = bytes.len(), "Model saved");
        Ok(())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let bytes = fs::read(path).with_context(|| format!("Failed to read model {:?}", path))?;
        Self::from_slice(&bytes).with_context(|| format!("Failed to parse model {:?}", path))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
