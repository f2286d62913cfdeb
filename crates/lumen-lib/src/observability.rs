//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, request and error counts, model state)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5,
];

static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors: IntCounterVec,
    model_loaded: IntGauge,
    model_load_failures: IntCounter,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "lumen_prediction_latency_seconds",
                "Time spent answering a prediction request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter!(
                "lumen_predictions_total",
                "Total number of predictions served"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors: register_int_counter_vec!(
                "lumen_prediction_errors_total",
                "Prediction requests that failed, by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            model_loaded: register_int_gauge!(
                "lumen_model_loaded",
                "1 once the model artifact is loaded, else 0"
            )
            .expect("Failed to register model_loaded"),

            model_load_failures: register_int_counter!(
                "lumen_model_load_failures_total",
                "Attempts to load the model artifact that failed"
            )
            .expect("Failed to register model_load_failures_total"),
        }
    }
}

/// Handle to the process-wide service metrics.
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    /// Count a failed request under its error kind
    pub fn inc_prediction_error(&self, kind: &str) {
        self.inner()
            .prediction_errors
            .with_label_values(&[kind])
            .inc();
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.inner().model_loaded.set(i64::from(loaded));
    }

    pub fn inc_model_load_failures(&self) {
        self.inner().model_load_failures.inc();
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Structured logger for service events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn log_startup(&self, version: &str, addr: &str, model_path: &str) {
        info!(
            event = "service_started",
            service = %self.service_name,
            version = %version,
            addr = %addr,
            model_path = %model_path,
            "Prediction service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Prediction service shutting down"
        );
    }

    pub fn log_model_loaded(&self, model_path: &str, trees: usize, features: &[String]) {
        info!(
            event = "model_loaded",
            service = %self.service_name,
            model_path = %model_path,
            trees = trees,
            features = ?features,
            "Model loaded"
        );
    }

    pub fn log_model_load_failed(&self, model_path: &str, reason: &str) {
        warn!(
            event = "model_load_failed",
            service = %self.service_name,
            model_path = %model_path,
            reason = %reason,
            "Model could not be loaded"
        );
    }

    /// Log one answered prediction request
    pub fn log_prediction(&self, inputs: &[(String, f64)], output: i64, latency_secs: f64) {
        info!(
            event = "prediction_served",
            service = %self.service_name,
            inputs = ?inputs,
            output = output,
            latency_secs = latency_secs,
            "Prediction served"
        );
    }
}
