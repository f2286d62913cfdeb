//! Timestamp alignment of per-key series and CSV output

use crate::error::ExportError;
use crate::models::TelemetryPoint;
use chrono::DateTime;
use std::path::Path;

/// One aligned row: a timestamp and one optional value per key
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub ts: i64,
    pub values: Vec<Option<f64>>,
}

/// Keys aligned on the timestamps of the first non-empty series
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedTable {
    pub keys: Vec<String>,
    pub rows: Vec<MergedRow>,
}

/// As-of join of every series onto the first one that has points.
///
/// Each axis row picks, from every other series, the latest point at or
/// before its timestamp, provided it is at most `tolerance_ms` older. Rows
/// without such a point get a missing value for that key. Every key keeps
/// its column, in input order, even when its series is empty.
pub fn merge_asof(series: &[(String, Vec<TelemetryPoint>)], tolerance_ms: i64) -> MergedTable {
    let keys: Vec<String> = series.iter().map(|(key, _)| key.clone()).collect();
    let sorted: Vec<Vec<TelemetryPoint>> = series
        .iter()
        .map(|(_, points)| {
            let mut sorted = points.clone();
            sorted.sort_by_key(|p| p.ts);
            sorted
        })
        .collect();

    let Some(axis) = sorted.iter().position(|points| !points.is_empty()) else {
        return MergedTable {
            keys,
            rows: Vec::new(),
        };
    };

    let rows = sorted[axis]
        .iter()
        .map(|p| {
            let values = sorted
                .iter()
                .enumerate()
                .map(|(i, other)| {
                    if i == axis {
                        p.value
                    } else {
                        lookup_backward(other, p.ts, tolerance_ms)
                    }
                })
                .collect();
            MergedRow { ts: p.ts, values }
        })
        .collect();

    MergedTable { keys, rows }
}

/// Latest point with `ts <= at` and `at - ts <= tolerance_ms`
fn lookup_backward(sorted: &[TelemetryPoint], at: i64, tolerance_ms: i64) -> Option<f64> {
    let idx = sorted.partition_point(|p| p.ts <= at);
    let candidate = sorted.get(idx.checked_sub(1)?)?;
    if at - candidate.ts <= tolerance_ms {
        candidate.value
    } else {
        None
    }
}

/// Render epoch milliseconds as `YYYY-MM-DD HH:MM:SS.mmm` (UTC)
pub fn format_ts(ts_ms: i64) -> String {
    DateTime::from_timestamp_millis(ts_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| ts_ms.to_string())
}

impl MergedTable {
    /// Write `ts,<key1>,<key2>,...` with empty cells for missing values
    pub fn write_csv(&self, path: &Path) -> Result<(), ExportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let write_err = |source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = csv::Writer::from_path(path).map_err(write_err)?;

        let mut header = vec!["ts".to_string()];
        header.extend(self.keys.iter().cloned());
        writer.write_record(&header).map_err(write_err)?;

        for row in &self.rows {
            let mut record = vec![format_ts(row.ts)];
            record.extend(
                row.values
                    .iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record).map_err(write_err)?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(data: &[(i64, f64)]) -> Vec<TelemetryPoint> {
        data.iter()
            .map(|&(ts, v)| TelemetryPoint { ts, value: Some(v) })
            .collect()
    }

    #[test]
    fn test_merge_asof_backward_within_tolerance() {
        let series = vec![
            ("ldr".to_string(), points(&[(10_000, 100.0), (20_000, 200.0), (30_000, 300.0)])),
            ("motion".to_string(), points(&[(9_000, 1.0), (21_000, 0.0)])),
            ("led".to_string(), points(&[(10_000, 50.0), (26_000, 60.0)])),
        ];
        let table = merge_asof(&series, 5_000);

        assert_eq!(table.keys, vec!["ldr", "motion", "led"]);
        assert_eq!(table.rows.len(), 3);
        // exact and 1s-old matches
        assert_eq!(table.rows[0].values, vec![Some(100.0), Some(1.0), Some(50.0)]);
        // motion at 21s is in the future, the 9s one is 11s old
        assert_eq!(table.rows[1].values, vec![Some(200.0), None, None]);
        // 9s-old motion is out of tolerance, 4s-old led is in
        assert_eq!(table.rows[2].values, vec![Some(300.0), None, Some(60.0)]);
    }

    #[test]
    fn test_merge_uses_first_series_as_axis() {
        let series = vec![
            ("led".to_string(), points(&[(5_000, 1.0)])),
            ("ldr".to_string(), points(&[(1_000, 2.0), (4_000, 3.0), (9_000, 4.0)])),
        ];
        let table = merge_asof(&series, 5_000);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].values, vec![Some(1.0), Some(3.0)]);
    }

    #[test]
    fn test_empty_series_keeps_its_column() {
        let series = vec![
            ("ldr".to_string(), Vec::new()),
            ("motion".to_string(), points(&[(1_000, 1.0), (2_000, 0.0)])),
            ("led".to_string(), Vec::new()),
        ];
        let table = merge_asof(&series, 5_000);

        assert_eq!(table.keys, vec!["ldr", "motion", "led"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].ts, 1_000);
        assert_eq!(table.rows[0].values, vec![None, Some(1.0), None]);
        assert_eq!(table.rows[1].values, vec![None, Some(0.0), None]);
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_asof(&[], 5_000).rows.is_empty());
    }

    #[test]
    fn test_format_ts() {
        assert_eq!(format_ts(1_700_000_000_123), "2023-11-14 22:13:20.123");
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("history.csv");
        let table = MergedTable {
            keys: vec!["ldr".into(), "led".into()],
            rows: vec![MergedRow {
                ts: 0,
                values: vec![Some(812.0), None],
            }],
        };
        table.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["ts,ldr,led", "1970-01-01 00:00:00.000,812,"]);
    }
}
