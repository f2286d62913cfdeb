//! Offline training pipeline
//!
//! load → clean → validate → outliers → describe → split → fit → evaluate →
//! persist → sample predictions. Every fatal condition is returned as a
//! [`PipelineError`]; nothing is written unless the fit and the optional
//! quality gate succeed.

mod cleaning;
mod evaluation;
mod loader;
mod outliers;
mod persistence;
mod split;
mod stats;
mod validation;

#[cfg(test)]
mod tests;

pub use cleaning::{clean, coerce_numeric, CleaningReport};
pub use evaluation::{
    clamp_prediction, evaluate, mean_absolute_error, output_level, r2_score,
};
pub use loader::{load_table, RawTable};
pub use outliers::{remove_outliers, OutlierConfig, OutlierReport};
pub use persistence::ModelArtifact;
pub use split::train_test_split;
pub use stats::{describe, describe_column, quantile, std_dev, ColumnStats};
pub use validation::{validate, ValidationReport, MIN_SAMPLES};

use crate::error::PipelineError;
use crate::forest::{ForestParams, RandomForest};
use crate::models::{EvaluationMetrics, Schema};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// A named input used for post-training sanity predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Values in schema feature order
    pub features: Vec<f64>,
}

impl Scenario {
    fn new(name: &str, features: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            features: features.to_vec(),
        }
    }
}

fn default_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("Dark + No Motion", &[100.0, 0.0]),
        Scenario::new("Dark + Motion", &[100.0, 1.0]),
        Scenario::new("Bright + No Motion", &[3000.0, 0.0]),
        Scenario::new("Bright + Motion", &[3000.0, 1.0]),
        Scenario::new("Medium + Motion", &[1500.0, 1.0]),
    ]
}

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Exported telemetry table
    pub input_path: PathBuf,
    /// Where the model artifact is written
    pub model_path: PathBuf,
    pub schema: Schema,
    /// Abort when fewer valid rows remain
    pub min_samples: usize,
    pub outliers: OutlierConfig,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub forest: ForestParams,
    /// Refuse to persist when test R² is below this value (off by default)
    pub min_test_r2: Option<f64>,
    /// Continuous columns with a lower standard deviation trigger a warning
    pub low_variance_threshold: f64,
    pub scenarios: Vec<Scenario>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/thingsboard_history.csv"),
            model_path: PathBuf::from("led_predictor.json"),
            schema: Schema::default(),
            min_samples: MIN_SAMPLES,
            outliers: OutlierConfig::default(),
            test_fraction: 0.2,
            split_seed: 42,
            forest: ForestParams::default(),
            min_test_r2: None,
            low_variance_threshold: 1.0,
            scenarios: default_scenarios(),
        }
    }
}

impl TrainingConfig {
    fn check(&self) -> Result<(), PipelineError> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.forest.n_estimators == 0 {
            return Err(PipelineError::InvalidConfig(
                "forest.n_estimators must be positive".to_string(),
            ));
        }
        if self.schema.features.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "schema needs at least one feature".to_string(),
            ));
        }
        Ok(())
    }
}

/// Prediction for one configured scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplePrediction {
    pub name: String,
    pub features: Vec<f64>,
    pub prediction: i64,
}

/// Everything a training run observed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub rows_loaded: usize,
    pub cleaning: CleaningReport,
    pub validation: ValidationReport,
    pub outliers: OutlierReport,
    pub statistics: Vec<ColumnStats>,
    /// Continuous columns whose spread is too small to learn from
    pub low_variance_columns: Vec<String>,
    pub train_samples: usize,
    pub test_samples: usize,
    pub metrics: EvaluationMetrics,
    pub model_path: PathBuf,
    pub sample_predictions: Vec<SamplePrediction>,
}

/// Runs the training stages in order
pub struct TrainingPipeline {
    config: TrainingConfig,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn run(&self) -> Result<TrainingReport, PipelineError> {
        let config = &self.config;
        config.check()?;
        let schema = &config.schema;

        info!(input = %config.input_path.display(), "Starting training run");
        let table = load_table(&config.input_path, schema)?;
        let rows_loaded = table.len();

        let (mut dataset, cleaning) = clean(&table);
        let validation = validate(&mut dataset, schema, config.min_samples)?;
        let outliers = remove_outliers(&mut dataset, &config.outliers);

        let statistics = describe(&dataset);
        let low_variance_columns: Vec<String> = schema
            .columns()
            .filter(|c| c.constraint.is_continuous())
            .filter(|c| {
                statistics
                    .iter()
                    .any(|s| s.name == c.name && s.std < config.low_variance_threshold)
            })
            .map(|c| c.name.clone())
            .collect();
        for column in &low_variance_columns {
            warn!(column = %column, "Variance too low, the model may not learn well");
        }

        let (train, test) = train_test_split(&dataset, config.test_fraction, config.split_seed);
        if train.is_empty() || test.is_empty() {
            return Err(PipelineError::InvalidConfig(format!(
                "split produced {} train and {} test samples",
                train.len(),
                test.len()
            )));
        }
        info!(train = train.len(), test = test.len(), "Split dataset");

        let forest = RandomForest::fit(&train.features, &train.labels, &config.forest)
            .map_err(|e| PipelineError::Model(e.to_string()))?;

        let output_range = schema.output_range();
        let metrics = evaluate(&forest, &train, &test, output_range)?;

        if let Some(min) = config.min_test_r2 {
            if metrics.test.r2 < min {
                return Err(PipelineError::QualityGate {
                    r2: metrics.test.r2,
                    min,
                });
            }
        }

        let artifact = ModelArtifact {
            feature_names: schema.feature_names(),
            label_name: schema.label.name.clone(),
            output_range,
            trained_at: Utc::now(),
            metrics: metrics.clone(),
            forest,
        };
        artifact.save(&config.model_path)?;

        let sample_predictions = config
            .scenarios
            .iter()
            .filter(|s| s.features.len() == artifact.feature_names.len())
            .map(|s| {
                let raw = artifact
                    .forest
                    .predict(&s.features)
                    .map_err(|e| PipelineError::Model(e.to_string()))?;
                let prediction = output_level(raw, output_range);
                info!(scenario = %s.name, prediction, "Sample prediction");
                Ok(SamplePrediction {
                    name: s.name.clone(),
                    features: s.features.clone(),
                    prediction,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;

        Ok(TrainingReport {
            rows_loaded,
            cleaning,
            validation,
            outliers,
            statistics,
            low_variance_columns,
            train_samples: train.len(),
            test_samples: test.len(),
            metrics,
            model_path: config.model_path.clone(),
            sample_predictions,
        })
    }
}
