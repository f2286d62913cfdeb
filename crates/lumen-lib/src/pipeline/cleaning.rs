//! Numeric coercion, missing-value removal and de-duplication

use super::loader::RawTable;
use crate::models::Dataset;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

/// Counts reported by the cleaning stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    /// Cells that were empty or failed numeric coercion
    pub missing_values: usize,
    pub rows_with_missing: usize,
    pub duplicates_removed: usize,
    pub rows_out: usize,
}

/// Parse a cell as a finite number; anything else counts as missing
pub fn coerce_numeric(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Convert a raw table into a numeric dataset.
///
/// The last column of `table` is the label. Rows with any missing value are
/// dropped, exact duplicates keep their first occurrence.
pub fn clean(table: &RawTable) -> (Dataset, CleaningReport) {
    let n_features = table.columns.len().saturating_sub(1);
    let feature_names = table.columns[..n_features].to_vec();
    let label_name = table.columns.get(n_features).cloned().unwrap_or_default();

    let mut report = CleaningReport {
        rows_in: table.len(),
        ..Default::default()
    };

    let mut dataset = Dataset::new(feature_names, label_name);
    let mut seen: HashSet<Vec<u64>> = HashSet::new();

    for row in &table.rows {
        let values: Vec<Option<f64>> = row.iter().map(|cell| coerce_numeric(cell)).collect();
        let missing = values.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            report.missing_values += missing;
            report.rows_with_missing += 1;
            continue;
        }

        let values: Vec<f64> = values.into_iter().flatten().collect();
        // -0.0 and 0.0 compare equal, so key on the normalized bit pattern
        let key: Vec<u64> = values.iter().map(|v| (v + 0.0).to_bits()).collect();
        if !seen.insert(key) {
            report.duplicates_removed += 1;
            continue;
        }

        let label = values[n_features];
        dataset.push(values[..n_features].to_vec(), label);
    }

    report.rows_out = dataset.len();

    if report.rows_with_missing > 0 {
        warn!(
            missing_values = report.missing_values,
            rows_dropped = report.rows_with_missing,
            "Dropped rows with missing or non-numeric values"
        );
    }
    if report.duplicates_removed > 0 {
        info!(duplicates = report.duplicates_removed, "Removed duplicate rows");
    }

    (dataset, report)
}
