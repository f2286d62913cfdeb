//! Descriptive statistics over dataset columns

use crate::models::Dataset;
use serde::Serialize;

/// Summary of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Quantile with linear interpolation between order statistics.
///
/// `q` is in [0, 1]; position is `q * (n - 1)` over the sorted values.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; zero for fewer than two values
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

pub fn describe_column(name: &str, values: &[f64]) -> ColumnStats {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let (min, q25, median, q75, max) = if sorted.is_empty() {
        (f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN)
    } else {
        (
            sorted[0],
            quantile_sorted(&sorted, 0.25),
            quantile_sorted(&sorted, 0.5),
            quantile_sorted(&sorted, 0.75),
            sorted[sorted.len() - 1],
        )
    };
    ColumnStats {
        name: name.to_string(),
        count: values.len(),
        mean: mean(values),
        std: std_dev(values),
        min,
        q25,
        median,
        q75,
        max,
    }
}

/// Describe every feature column and the label
pub fn describe(dataset: &Dataset) -> Vec<ColumnStats> {
    dataset
        .column_names()
        .iter()
        .filter_map(|name| dataset.column(name).map(|v| describe_column(name, &v)))
        .collect()
}
