//! Telemetry export
//!
//! Downloads each configured key from the device telemetry API, aligns the
//! series on the first key's timestamps and writes the history table the
//! training pipeline reads.

mod client;
mod merge;

pub use client::{coerce_value, TelemetryClient};
pub use merge::{format_ts, merge_asof, MergedRow, MergedTable};

use crate::error::ExportError;
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub base_url: String,
    pub device_token: String,
    /// Keys to download; the first one defines the row timestamps
    pub keys: Vec<String>,
    pub lookback_days: i64,
    /// Maximum age of a matched point in the as-of join
    pub tolerance_ms: i64,
    pub output_path: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            base_url: "https://demo.thingsboard.io".to_string(),
            device_token: String::new(),
            keys: vec!["ldr".to_string(), "motion".to_string(), "led".to_string()],
            lookback_days: 3,
            tolerance_ms: 5_000,
            output_path: PathBuf::from("data/thingsboard_history.csv"),
            request_timeout_secs: 30,
        }
    }
}

/// What an export run downloaded and wrote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    /// Points received per key, in request order
    pub points_per_key: Vec<(String, usize)>,
    /// Keys whose download failed and were skipped
    pub failed_keys: Vec<String>,
    pub rows_written: usize,
    pub output_path: PathBuf,
}

/// Export the last `lookback_days` of telemetry
pub async fn export(config: &ExportConfig) -> Result<ExportSummary, ExportError> {
    let end = Utc::now();
    let start = end - ChronoDuration::days(config.lookback_days);
    export_range(config, start.timestamp_millis(), end.timestamp_millis()).await
}

/// Export telemetry over `[start_ms, end_ms]`.
///
/// A key that fails to download is logged and skipped. A key that answers
/// with no points still gets an empty column. The run fails only when no
/// key returned any data.
pub async fn export_range(
    config: &ExportConfig,
    start_ms: i64,
    end_ms: i64,
) -> Result<ExportSummary, ExportError> {
    let client = TelemetryClient::new(
        &config.base_url,
        &config.device_token,
        Duration::from_secs(config.request_timeout_secs),
    )?;

    info!(
        keys = ?config.keys,
        start_ms,
        end_ms,
        "Exporting telemetry"
    );

    let mut series = Vec::with_capacity(config.keys.len());
    let mut points_per_key = Vec::with_capacity(config.keys.len());
    let mut failed_keys = Vec::new();

    for key in &config.keys {
        match client.fetch_series(key, start_ms, end_ms).await {
            Ok(points) => {
                info!(key = %key, points = points.len(), "Downloaded series");
                points_per_key.push((key.clone(), points.len()));
                series.push((key.clone(), points));
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Skipping key");
                failed_keys.push(key.clone());
            }
        }
    }

    if series.iter().all(|(_, points)| points.is_empty()) {
        return Err(ExportError::NoTelemetry);
    }

    let table = merge_asof(&series, config.tolerance_ms);
    table.write_csv(&config.output_path)?;

    info!(
        rows = table.rows.len(),
        output = %config.output_path.display(),
        "Wrote telemetry history"
    );

    Ok(ExportSummary {
        points_per_key,
        failed_keys,
        rows_written: table.rows.len(),
        output_path: config.output_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(server: &mockito::Server, dir: &tempfile::TempDir) -> ExportConfig {
        ExportConfig {
            base_url: server.url(),
            device_token: "tok".to_string(),
            output_path: dir.path().join("data").join("history.csv"),
            request_timeout_secs: 5,
            ..Default::default()
        }
    }

    async fn mock_key(server: &mut mockito::Server, key: &str, status: usize, body: &str) {
        server
            .mock("GET", "/api/v1/tok/telemetry")
            .match_query(Matcher::UrlEncoded("keys".into(), key.into()))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_export_writes_aligned_table() {
        let mut server = mockito::Server::new_async().await;
        mock_key(
            &mut server,
            "ldr",
            200,
            r#"{"ldr":[{"ts":1000,"value":"812"},{"ts":2000,"value":"640"}]}"#,
        )
        .await;
        mock_key(&mut server, "motion", 200, r#"{"motion":[{"ts":1500,"value":"1"}]}"#).await;
        mock_key(&mut server, "led", 200, r#"{"led":[{"ts":1000,"value":"90"}]}"#).await;

        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&server, &dir);
        let summary = export_range(&cfg, 0, 10_000).await.unwrap();

        assert_eq!(summary.rows_written, 2);
        assert!(summary.failed_keys.is_empty());
        assert_eq!(
            summary.points_per_key,
            vec![
                ("ldr".to_string(), 2),
                ("motion".to_string(), 1),
                ("led".to_string(), 1)
            ]
        );

        let text = std::fs::read_to_string(&cfg.output_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "ts,ldr,motion,led",
                "1970-01-01 00:00:01.000,812,,90",
                "1970-01-01 00:00:02.000,640,1,90",
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_key_is_skipped() {
        let mut server = mockito::Server::new_async().await;
        mock_key(&mut server, "ldr", 200, r#"{"ldr":[{"ts":1000,"value":"5"}]}"#).await;
        mock_key(&mut server, "motion", 500, "").await;
        mock_key(&mut server, "led", 200, r#"{"led":[{"ts":1000,"value":"7"}]}"#).await;

        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&server, &dir);
        let summary = export_range(&cfg, 0, 10_000).await.unwrap();

        assert_eq!(summary.failed_keys, vec!["motion".to_string()]);
        let text = std::fs::read_to_string(&cfg.output_path).unwrap();
        assert_eq!(text.lines().next(), Some("ts,ldr,led"));
    }

    #[tokio::test]
    async fn test_key_without_points_keeps_empty_column() {
        let mut server = mockito::Server::new_async().await;
        mock_key(&mut server, "ldr", 200, r#"{"ldr":[{"ts":1000,"value":"5"}]}"#).await;
        mock_key(&mut server, "motion", 200, "{}").await;
        mock_key(&mut server, "led", 200, r#"{"led":[{"ts":1000,"value":"7"}]}"#).await;

        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&server, &dir);
        let summary = export_range(&cfg, 0, 10_000).await.unwrap();

        assert!(summary.failed_keys.is_empty());
        assert_eq!(summary.points_per_key[1], ("motion".to_string(), 0));
        let text = std::fs::read_to_string(&cfg.output_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["ts,ldr,motion,led", "1970-01-01 00:00:01.000,5,,7"]);
    }

    #[tokio::test]
    async fn test_no_data_at_all_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        mock_key(&mut server, "ldr", 401, "").await;
        mock_key(&mut server, "motion", 200, "{}").await;
        mock_key(&mut server, "led", 401, "").await;

        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&server, &dir);
        assert!(matches!(
            export_range(&cfg, 0, 10_000).await,
            Err(ExportError::NoTelemetry)
        ));
        assert!(!cfg.output_path.exists());
    }
}
