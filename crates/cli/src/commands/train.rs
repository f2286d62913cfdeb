//! Model training command

use anyhow::{Context, Result};
use colored::Colorize;
use lumen_lib::pipeline::{TrainingConfig, TrainingPipeline, TrainingReport};
use tabled::Tabled;

use crate::output::{
    color_r2, format_float, level_bar, print_heading, print_json, print_success, print_table,
    print_warning, OutputFormat,
};

/// Row for the feature statistics table
#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "Column")]
    name: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Std")]
    std: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "25%")]
    q25: String,
    #[tabled(rename = "50%")]
    median: String,
    #[tabled(rename = "75%")]
    q75: String,
    #[tabled(rename = "Max")]
    max: String,
}

#[derive(Tabled)]
struct MetricsRow {
    #[tabled(rename = "Split")]
    split: &'static str,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "MAE")]
    mae: String,
    #[tabled(rename = "R²")]
    r2: String,
}

#[derive(Tabled)]
struct ImportanceRow {
    #[tabled(rename = "Feature")]
    feature: String,
    #[tabled(rename = "Importance")]
    importance: String,
}

#[derive(Tabled)]
struct ScenarioRow {
    #[tabled(rename = "Scenario")]
    name: String,
    #[tabled(rename = "Inputs")]
    inputs: String,
    #[tabled(rename = "LED")]
    level: i64,
    #[tabled(rename = "")]
    bar: String,
}

/// Run the training pipeline off the async runtime and print its report
pub async fn run_training(config: TrainingConfig, format: OutputFormat) -> Result<()> {
    let report = tokio::task::spawn_blocking(move || TrainingPipeline::new(config).run())
        .await
        .context("Training task panicked")?
        .context("Training failed")?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    Ok(())
}

fn stats_rows(report: &TrainingReport) -> Vec<StatsRow> {
    report
        .statistics
        .iter()
        .map(|s| StatsRow {
            name: s.name.clone(),
            count: s.count,
            mean: format_float(s.mean, 2),
            std: format_float(s.std, 2),
            min: format_float(s.min, 2),
            q25: format_float(s.q25, 2),
            median: format_float(s.median, 2),
            q75: format_float(s.q75, 2),
            max: format_float(s.max, 2),
        })
        .collect()
}

fn print_report(report: &TrainingReport) {
    print_heading("Data");
    println!("Rows loaded:            {}", report.rows_loaded);
    println!(
        "Rows with missing data: {} ({} cells)",
        report.cleaning.rows_with_missing, report.cleaning.missing_values
    );
    println!("Duplicates removed:     {}", report.cleaning.duplicates_removed);
    for (column, count) in &report.validation.violations {
        if *count > 0 {
            println!("Out of range:           {} ({})", count.to_string().yellow(), column);
        }
    }
    let outliers = &report.outliers;
    if outliers.removed {
        println!("Label outliers removed: {}", outliers.candidates);
    } else if outliers.candidates > 0 {
        print_warning(&format!(
            "{} label outliers kept (too many to remove safely)",
            outliers.candidates
        ));
    }
    println!(
        "Train / test:           {} / {}",
        report.train_samples, report.test_samples
    );

    print_heading("Feature Statistics");
    print_table(&stats_rows(report));
    for column in &report.low_variance_columns {
        print_warning(&format!(
            "'{}' barely varies, the model may not learn from it",
            column
        ));
    }

    print_heading("Evaluation");
    let metrics = &report.metrics;
    print_table(&[
        MetricsRow {
            split: "train",
            samples: metrics.train.samples,
            mae: format_float(metrics.train.mae, 2),
            r2: color_r2(metrics.train.r2),
        },
        MetricsRow {
            split: "test",
            samples: metrics.test.samples,
            mae: format_float(metrics.test.mae, 2),
            r2: color_r2(metrics.test.r2),
        },
    ]);

    let mut ranked = metrics.feature_importances.clone();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let importances: Vec<ImportanceRow> = ranked
        .into_iter()
        .map(|(feature, importance)| ImportanceRow {
            feature,
            importance: format_float(importance, 3),
        })
        .collect();
    print_table(&importances);

    print_heading("Sample Predictions");
    let scenarios: Vec<ScenarioRow> = report
        .sample_predictions
        .iter()
        .map(|p| ScenarioRow {
            name: p.name.clone(),
            inputs: p
                .features
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            level: p.prediction,
            bar: level_bar(p.prediction),
        })
        .collect();
    print_table(&scenarios);

    println!();
    print_success(&format!("Model saved to {}", report.model_path.display()));
}
