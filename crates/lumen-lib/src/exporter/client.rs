//! HTTP client for the device telemetry API of the time-series store

use crate::error::ExportError;
use crate::models::TelemetryPoint;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// One raw entry as returned by the store; values usually arrive as strings
#[derive(Debug, Deserialize)]
struct RawPoint {
    ts: i64,
    value: serde_json::Value,
}

/// Read a telemetry value as a number; non-numeric values become missing
pub fn coerce_value(value: &serde_json::Value) -> Option<f64> {
    let v = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        serde_json::Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    v.filter(|v| v.is_finite())
}

/// Client bound to one device access token
pub struct TelemetryClient {
    client: Client,
    telemetry_url: Url,
}

impl TelemetryClient {
    pub fn new(base_url: &str, device_token: &str, timeout: Duration) -> Result<Self, ExportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ExportError::Request {
                key: String::new(),
                source,
            })?;

        let base = Url::parse(base_url)?;
        let telemetry_url = base.join(&format!("api/v1/{}/telemetry", device_token))?;

        Ok(Self {
            client,
            telemetry_url,
        })
    }

    /// Fetch one key's series over `[start_ms, end_ms]`.
    ///
    /// A key absent from the response yields an empty series. Non-2xx
    /// responses are errors; nothing is retried.
    pub async fn fetch_series(
        &self,
        key: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<TelemetryPoint>, ExportError> {
        let request_err = |source| ExportError::Request {
            key: key.to_string(),
            source,
        };

        let response = self
            .client
            .get(self.telemetry_url.clone())
            .query(&[
                ("keys", key.to_string()),
                ("startTs", start_ms.to_string()),
                ("endTs", end_ms.to_string()),
            ])
            .send()
            .await
            .map_err(request_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::Status {
                key: key.to_string(),
                status,
            });
        }

        let mut body: HashMap<String, Vec<RawPoint>> =
            response.json().await.map_err(request_err)?;

        let Some(raw) = body.remove(key) else {
            warn!(key = %key, "No data for key");
            return Ok(Vec::new());
        };

        let mut points: Vec<TelemetryPoint> = raw
            .iter()
            .map(|p| TelemetryPoint {
                ts: p.ts,
                value: coerce_value(&p.value),
            })
            .collect();
        points.sort_by_key(|p| p.ts);

        debug!(key = %key, points = points.len(), "Fetched series");
        Ok(points)
    }
}
