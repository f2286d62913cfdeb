//! Model evaluation on train/test splits
//!
//! Predictions are clamped to the actuator's output range before scoring,
//! matching what the device will actually receive.

use crate::error::PipelineError;
use crate::forest::RandomForest;
use crate::models::{Dataset, EvaluationMetrics, SplitMetrics};
use tracing::info;

/// Clamp a prediction into `[lo, hi]`. NaN maps to `lo`.
pub fn clamp_prediction(value: f64, (lo, hi): (f64, f64)) -> f64 {
    if value.is_nan() {
        return lo;
    }
    value.clamp(lo, hi)
}

/// Truncate toward zero, then clamp into the integer output range.
///
/// This is the value sent back to the device.
pub fn output_level(value: f64, (lo, hi): (f64, f64)) -> i64 {
    let lo = lo.ceil() as i64;
    let hi = (hi.floor() as i64).max(lo);
    (value as i64).clamp(lo, hi)
}

pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let total: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum();
    total / y_true.len() as f64
}

/// Coefficient of determination.
///
/// For a constant target the score is 1.0 on a perfect fit and 0.0
/// otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

fn score_split(
    model: &RandomForest,
    data: &Dataset,
    range: (f64, f64),
) -> Result<SplitMetrics, PipelineError> {
    let predictions: Vec<f64> = model
        .predict_many(&data.features)
        .map_err(|e| PipelineError::Model(e.to_string()))?
        .into_iter()
        .map(|p| clamp_prediction(p, range))
        .collect();
    Ok(SplitMetrics {
        samples: data.len(),
        mae: mean_absolute_error(&data.labels, &predictions),
        r2: r2_score(&data.labels, &predictions),
    })
}

/// Score the model on both splits and collect feature importances
pub fn evaluate(
    model: &RandomForest,
    train: &Dataset,
    test: &Dataset,
    output_range: (f64, f64),
) -> Result<EvaluationMetrics, PipelineError> {
    let train_metrics = score_split(model, train, output_range)?;
    let test_metrics = score_split(model, test, output_range)?;

    info!(mae = train_metrics.mae, r2 = train_metrics.r2, "Train metrics");
    info!(mae = test_metrics.mae, r2 = test_metrics.r2, "Test metrics");

    let feature_importances: Vec<(String, f64)> = train
        .feature_names
        .iter()
        .cloned()
        .zip(model.feature_importances())
        .collect();
    for (name, importance) in &feature_importances {
        info!(feature = %name, importance, "Feature importance");
    }

    Ok(EvaluationMetrics {
        train: train_metrics,
        test: test_metrics,
        feature_importances,
    })
}
