//! Per-sample range validation and the minimum-sample policy

use crate::error::PipelineError;
use crate::models::{Dataset, Schema};
use serde::Serialize;
use tracing::{error, info};

/// Minimum number of valid samples required to train
pub const MIN_SAMPLES: usize = 50;

/// Outcome of the validation stage
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub rows_in: usize,
    /// (column, rows violating its constraint)
    pub violations: Vec<(String, usize)>,
    pub rows_out: usize,
}

impl ValidationReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_in - self.rows_out
    }
}

/// Drop every row that violates a column constraint, then enforce
/// `min_samples`. Values are never clamped here.
pub fn validate(
    dataset: &mut Dataset,
    schema: &Schema,
    min_samples: usize,
) -> Result<ValidationReport, PipelineError> {
    let mut report = ValidationReport {
        rows_in: dataset.len(),
        ..Default::default()
    };
    let mut counts = vec![0usize; schema.features.len() + 1];

    for column in schema.columns() {
        if let Some(values) = dataset.column(&column.name) {
            let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            info!(column = %column.name, min = lo, max = hi, "Observed range");
        }
    }

    dataset.retain(|features, label| {
        let mut valid = true;
        for (i, spec) in schema.features.iter().enumerate() {
            if !spec.constraint.admits(features[i]) {
                counts[i] += 1;
                valid = false;
            }
        }
        if !schema.label.constraint.admits(label) {
            counts[schema.features.len()] += 1;
            valid = false;
        }
        valid
    });

    report.violations = schema
        .columns()
        .map(|c| c.name.clone())
        .zip(counts)
        .collect();
    report.rows_out = dataset.len();

    if report.rows_out < min_samples {
        error!(
            found = report.rows_out,
            required = min_samples,
            "Insufficient valid samples, collect more telemetry before training"
        );
        return Err(PipelineError::InsufficientSamples {
            found: report.rows_out,
            required: min_samples,
        });
    }

    info!(
        samples = report.rows_out,
        dropped = report.rows_dropped(),
        "Clean dataset validated"
    );
    Ok(report)
}
