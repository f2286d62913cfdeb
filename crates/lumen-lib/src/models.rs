//! Core data models for the LED prediction pipeline

use serde::{Deserialize, Serialize};

/// A single telemetry reading for one key, as exported from the store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    /// Epoch milliseconds
    pub ts: i64,
    /// `None` when the reported value could not be read as a number
    pub value: Option<f64>,
}

/// Admissible values for a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// Inclusive range
    Range { min: f64, max: f64 },
    /// Exact set membership
    OneOf { values: Vec<f64> },
}

impl Constraint {
    pub fn admits(&self, value: f64) -> bool {
        match self {
            Constraint::Range { min, max } => value >= *min && value <= *max,
            Constraint::OneOf { values } => values.iter().any(|v| *v == value),
        }
    }

    /// Continuous columns are the ones bounded by a range
    pub fn is_continuous(&self) -> bool {
        matches!(self, Constraint::Range { .. })
    }
}

/// A named column and its admissible values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub constraint: Constraint,
}

impl ColumnSpec {
    pub fn range(name: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            constraint: Constraint::Range { min, max },
        }
    }

    pub fn one_of(name: &str, values: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            constraint: Constraint::OneOf {
                values: values.to_vec(),
            },
        }
    }
}

/// Column layout shared by the exporter output, the pipeline and the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    /// Model inputs, in model order
    pub features: Vec<ColumnSpec>,
    /// Training target
    pub label: ColumnSpec,
    /// Timestamp/index columns removed before anything else
    pub drop_columns: Vec<String>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            features: vec![
                ColumnSpec::range("ldr", 0.0, 4095.0),
                ColumnSpec::one_of("motion", &[0.0, 1.0]),
            ],
            label: ColumnSpec::range("led", 0.0, 255.0),
            drop_columns: vec!["ts".to_string(), "Unnamed: 0".to_string()],
        }
    }
}

impl Schema {
    /// Required columns: features followed by the label
    pub fn required_columns(&self) -> Vec<&str> {
        self.columns().map(|c| c.name.as_str()).collect()
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.features.iter().chain(std::iter::once(&self.label))
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|c| c.name.clone()).collect()
    }

    /// Output range of the label, used to clamp predictions
    pub fn output_range(&self) -> (f64, f64) {
        match &self.label.constraint {
            Constraint::Range { min, max } => (*min, *max),
            Constraint::OneOf { values } => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                (min, max)
            }
        }
    }
}

/// Numeric training samples: one feature row and one label per sample
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub label_name: String,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
}

impl Dataset {
    pub fn new(feature_names: Vec<String>, label_name: impl Into<String>) -> Self {
        Self {
            feature_names,
            label_name: label_name.into(),
            features: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn push(&mut self, features: Vec<f64>, label: f64) {
        self.features.push(features);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Keep only the rows for which `keep(features, label)` holds
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[f64], f64) -> bool,
    {
        let features = std::mem::take(&mut self.features);
        let labels = std::mem::take(&mut self.labels);
        for (row, label) in features.into_iter().zip(labels) {
            if keep(&row, label) {
                self.features.push(row);
                self.labels.push(label);
            }
        }
    }

    /// Build a new dataset from a subset of row indices
    pub fn select(&self, indices: &[usize]) -> Self {
        let mut out = Self::new(self.feature_names.clone(), self.label_name.clone());
        for &i in indices {
            out.push(self.features[i].clone(), self.labels[i]);
        }
        out
    }

    /// All values of a named column (feature or label)
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        if name == self.label_name {
            return Some(self.labels.clone());
        }
        let idx = self.feature_names.iter().position(|n| n == name)?;
        Some(self.features.iter().map(|row| row[idx]).collect())
    }

    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.feature_names.clone();
        names.push(self.label_name.clone());
        names
    }
}

/// Error metrics for one data split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitMetrics {
    pub samples: usize,
    pub mae: f64,
    pub r2: f64,
}

/// Evaluation results recorded alongside the persisted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub train: SplitMetrics,
    pub test: SplitMetrics,
    /// (feature name, normalized importance)
    pub feature_importances: Vec<(String, f64)>,
}
