//! Telemetry export command

use anyhow::{Context, Result};
use colored::Colorize;
use lumen_lib::exporter::{self, ExportConfig, ExportSummary};
use tabled::Tabled;

use crate::output::{
    print_heading, print_json, print_success, print_table, print_warning, OutputFormat,
};

/// Row for the per-key download table
#[derive(Tabled)]
struct KeyRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Points")]
    points: String,
}

fn key_rows(summary: &ExportSummary) -> Vec<KeyRow> {
    let mut rows: Vec<KeyRow> = summary
        .points_per_key
        .iter()
        .map(|(key, points)| KeyRow {
            key: key.clone(),
            points: points.to_string(),
        })
        .collect();
    rows.extend(summary.failed_keys.iter().map(|key| KeyRow {
        key: key.clone(),
        points: "failed".red().to_string(),
    }));
    rows
}

/// Download the configured keys and write the history table
pub async fn run_export(config: &ExportConfig, format: OutputFormat) -> Result<()> {
    if config.device_token.is_empty() {
        anyhow::bail!("No device token configured (use --token or LUMEN_DEVICE_TOKEN)");
    }

    let summary = exporter::export(config)
        .await
        .context("Telemetry export failed")?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_heading("Telemetry Export");
            println!("Source:                 {}", config.base_url.cyan());
            println!("Window:                 last {} days", config.lookback_days);
            println!();
            print_table(&key_rows(&summary));

            for key in &summary.failed_keys {
                print_warning(&format!("Key '{}' could not be downloaded", key));
            }
            print_success(&format!(
                "Wrote {} rows to {}",
                summary.rows_written,
                summary.output_path.display()
            ));
        }
    }

    Ok(())
}
