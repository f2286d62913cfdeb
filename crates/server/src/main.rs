//! Lumen prediction service
//!
//! Serves LED brightness predictions from the model artifact produced by
//! `lumen train`. The artifact is loaded on first use, so the service can
//! start before a model exists.

use anyhow::Result;
use lumen_server::{
    api::{self, AppState},
    config::ServerConfig,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServerConfig::load()?;
    info!(
        service = %config.service_name,
        model_path = %config.model_path.display(),
        "Service configured"
    );

    let state = Arc::new(AppState::new(&config));
    state.metrics.set_model_loaded(false);
    state.logger.log_startup(
        SERVICE_VERSION,
        &config.bind_addr(),
        &config.model_path.display().to_string(),
    );

    let result = api::serve(&config, state.clone()).await;
    state.logger.log_shutdown(match &result {
        Ok(()) => "SIGINT received",
        Err(_) => "server error",
    });

    result
}
