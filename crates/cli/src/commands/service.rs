//! Commands that talk to a running prediction service

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use crate::client::{ApiClient, PredictRequest, Readiness};
use crate::output::{
    level_bar, print_heading, print_info, print_json, print_success, print_warning, OutputFormat,
};

/// Show the service banner and model readiness
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    // /status triggers the model load, so ask it before the banner
    let readiness = client.readiness().await?;
    let info = client.info().await?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "url": client.base_url().as_str(),
            "service": info.service,
            "status": info.status,
            "ready": readiness == Readiness::Ready,
        }))?,
        OutputFormat::Table => {
            print_heading("Prediction Service");
            println!("URL:                    {}", client.base_url().as_str().cyan());
            println!("Service:                {}", info.service);
            println!("Status:                 {}", info.status.green());
            match readiness {
                Readiness::Ready => print_success("Model loaded, ready for predictions"),
                Readiness::NotReady => {
                    print_warning("No model available yet");
                    print_info("Run `lumen train` and make sure the service can read the artifact");
                }
            }
        }
    }

    Ok(())
}

/// Request one prediction
pub async fn predict(
    client: &ApiClient,
    ldr: f64,
    motion: f64,
    format: OutputFormat,
) -> Result<()> {
    let request = PredictRequest { ldr, motion };
    let response = client.predict(&request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            println!(
                "ldr={} motion={} → led {} {}",
                ldr,
                motion,
                response.led.to_string().bold(),
                level_bar(response.led).yellow()
            );
        }
    }

    Ok(())
}
