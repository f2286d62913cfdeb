//! IQR-based outlier removal on the label column

use super::stats::quantile;
use crate::models::Dataset;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Outlier stage settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Fence distance in IQRs
    pub iqr_multiplier: f64,
    /// Outliers are removed only while they are fewer than this share of rows
    pub max_fraction: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            iqr_multiplier: 1.5,
            max_fraction: 0.10,
        }
    }
}

/// What the outlier stage observed and did
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutlierReport {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
    pub candidates: usize,
    pub removed: bool,
}

/// Remove label outliers outside `[Q1 - k*IQR, Q3 + k*IQR]`.
///
/// The dataset is left untouched when there are no candidates or when they
/// make up `max_fraction` of the rows or more.
pub fn remove_outliers(dataset: &mut Dataset, config: &OutlierConfig) -> OutlierReport {
    let q1 = quantile(&dataset.labels, 0.25);
    let q3 = quantile(&dataset.labels, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - config.iqr_multiplier * iqr;
    let upper = q3 + config.iqr_multiplier * iqr;

    let candidates = dataset
        .labels
        .iter()
        .filter(|&&y| y < lower || y > upper)
        .count();

    let removed =
        candidates > 0 && (candidates as f64) < dataset.len() as f64 * config.max_fraction;

    if removed {
        dataset.retain(|_, y| y >= lower && y <= upper);
        info!(removed = candidates, lower, upper, "Removed label outliers");
    } else {
        info!(candidates, lower, upper, "No significant outliers detected");
    }

    OutlierReport {
        q1,
        q3,
        lower,
        upper,
        candidates,
        removed,
    }
}
