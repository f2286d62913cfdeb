//! HTTP API for predictions, readiness and Prometheus metrics

use crate::config::ServerConfig;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use lumen_lib::{ModelStore, Prediction, ServiceMetrics, ServingError, StructuredLogger};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ModelStore>,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let logger = StructuredLogger::new(&config.service_name);
        Self {
            store: Arc::new(ModelStore::new(config.model_path.clone(), logger.clone())),
            metrics: ServiceMetrics::new(),
            logger,
        }
    }
}

/// A failed request, rendered as `{"error": "<message>"}`
#[derive(Debug)]
pub struct ApiError(pub ServingError);

impl From<ServingError> for ApiError {
    fn from(err: ServingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ServingError::ModelUnavailable => StatusCode::NOT_FOUND,
            ServingError::BadInput(_) | ServingError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Service banner
async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "service": state.logger.service_name(),
        "status": "running",
        "model_loaded": state.store.is_loaded(),
    }))
}

/// Readiness check: 200 "ready" once the model loads, 404 "not_ready" otherwise
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.get_or_load().await {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(_) => (StatusCode::NOT_FOUND, "not_ready"),
    }
}

async fn answer(state: &AppState, body: &[u8]) -> Result<Prediction, ServingError> {
    // A missing model wins over a malformed body
    state.store.get_or_load().await?;
    let request: Value = serde_json::from_slice(body)
        .map_err(|e| ServingError::BadInput(format!("invalid JSON body: {}", e)))?;
    state.store.predict(&request).await
}

async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let start = Instant::now();

    match answer(&state, &body).await {
        Ok(prediction) => {
            let latency = start.elapsed().as_secs_f64();
            state.metrics.observe_prediction_latency(latency);
            state.metrics.inc_predictions();
            state
                .logger
                .log_prediction(&prediction.inputs, prediction.level, latency);

            let mut response = Map::new();
            response.insert(prediction.label, prediction.level.into());
            Ok(Json(Value::Object(response)))
        }
        Err(e) => {
            state.metrics.inc_prediction_error(e.kind());
            warn!(kind = e.kind(), error = %e, "Prediction failed");
            Err(ApiError(e))
        }
    }
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            text,
        )
            .into_response(),
        Err(e) => ApiError(ServingError::Internal(e.to_string())).into_response(),
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/status", get(status))
        .route("/predict", post(predict))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server and run until Ctrl-C
pub async fn serve(config: &ServerConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = config.bind_addr();
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
