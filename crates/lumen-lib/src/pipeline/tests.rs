//! End-to-end tests for the training pipeline

use super::*;
use crate::forest::ForestParams;
use std::fmt::Write as _;
use std::path::Path;
use tempfile::TempDir;

/// Dark room → bright LED; motion adds a boost
fn led_for(ldr: f64, motion: f64) -> f64 {
    (230.0 - ldr / 20.0 + motion * 20.0).clamp(0.0, 255.0)
}

fn write_history(dir: &Path, valid_rows: usize, extra: &str) -> PathBuf {
    let mut csv = String::from("ts,ldr,motion,led\n");
    for i in 0..valid_rows {
        let ldr = (i * 37 % 4096) as f64;
        let motion = (i % 2) as f64;
        writeln!(
            csv,
            "2024-01-01 00:{:02}:{:02}.000,{},{},{}",
            (i / 60) % 60,
            i % 60,
            ldr,
            motion,
            led_for(ldr, motion)
        )
        .unwrap();
    }
    csv.push_str(extra);
    let path = dir.join("history.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn config(dir: &TempDir, input: PathBuf) -> TrainingConfig {
    TrainingConfig {
        input_path: input,
        model_path: dir.path().join("out").join("led_predictor.json"),
        forest: ForestParams {
            n_estimators: 25,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_full_run_persists_model_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_history(dir.path(), 300, "");
    let cfg = config(&dir, input);

    let report = TrainingPipeline::new(cfg.clone()).run().unwrap();

    assert_eq!(report.rows_loaded, 300);
    let total = report.train_samples + report.test_samples;
    assert!(total <= report.validation.rows_out);
    assert_eq!(report.test_samples, (total as f64 * 0.2).ceil() as usize);
    assert!(cfg.model_path.exists());
    assert!(report.metrics.test.r2 > 0.8, "test r2 {}", report.metrics.test.r2);
    assert_eq!(report.sample_predictions.len(), 5);
    for p in &report.sample_predictions {
        assert!((0..=255).contains(&p.prediction));
    }

    let dark = &report.sample_predictions[0];
    let bright = &report.sample_predictions[2];
    assert!(dark.prediction > bright.prediction);
}

#[test]
fn test_dirty_rows_are_cleaned_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let extra = "\
2024-01-02 00:00:00.000,,1,10\n\
2024-01-02 00:00:01.000,abc,1,10\n\
2024-01-02 00:00:02.000,5000,1,10\n\
2024-01-02 00:00:03.000,100,3,10\n\
2024-01-02 00:00:04.000,100,1,-5\n";
    let input = write_history(dir.path(), 120, extra);
    let report = TrainingPipeline::new(config(&dir, input)).run().unwrap();

    assert_eq!(report.rows_loaded, 125);
    assert_eq!(report.cleaning.rows_with_missing, 2);
    assert_eq!(report.validation.rows_dropped(), 3);
}

#[test]
fn test_49_valid_rows_abort_before_fit() {
    let dir = tempfile::tempdir().unwrap();
    // Out-of-range rows do not count toward the minimum
    let input = write_history(dir.path(), 49, "2024-01-02 00:00:00.000,9999,0,10\n");
    let cfg = config(&dir, input);

    let err = TrainingPipeline::new(cfg.clone()).run().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InsufficientSamples {
            found: 49,
            required: 50
        }
    ));
    assert!(!cfg.model_path.exists());
}

#[test]
fn test_50_valid_rows_proceed() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_history(dir.path(), 50, "");
    let cfg = config(&dir, input);

    let report = TrainingPipeline::new(cfg.clone()).run().unwrap();
    assert_eq!(report.train_samples, 40);
    assert_eq!(report.test_samples, 10);
    assert!(cfg.model_path.exists());
}

#[test]
fn test_missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, dir.path().join("nope.csv"));
    assert!(matches!(
        TrainingPipeline::new(cfg).run(),
        Err(PipelineError::InputNotFound(_))
    ));
}

#[test]
fn test_quality_gate_blocks_persist_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_history(dir.path(), 100, "");
    let cfg = TrainingConfig {
        min_test_r2: Some(1.5),
        ..config(&dir, input)
    };

    let err = TrainingPipeline::new(cfg.clone()).run().unwrap_err();
    assert!(matches!(err, PipelineError::QualityGate { .. }));
    assert!(!cfg.model_path.exists());
}

#[test]
fn test_persisted_model_reproduces_training_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_history(dir.path(), 200, "");
    let cfg = config(&dir, input);
    let report = TrainingPipeline::new(cfg.clone()).run().unwrap();

    let artifact = ModelArtifact::load(&cfg.model_path).unwrap();
    for sample in &report.sample_predictions {
        let raw = artifact.forest.predict(&sample.features).unwrap();
        let level = output_level(raw, artifact.output_range);
        assert_eq!(level, sample.prediction);
    }

    // Retraining with the same seed yields the same model
    TrainingPipeline::new(cfg.clone()).run().unwrap();
    let again = ModelArtifact::load(&cfg.model_path).unwrap();
    let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64 * 200.0, (i % 2) as f64]).collect();
    assert_eq!(
        again.forest.predict_many(&rows).unwrap(),
        artifact.forest.predict_many(&rows).unwrap()
    );
    assert_eq!(
        again.forest.feature_importances(),
        artifact.forest.feature_importances()
    );
}

#[test]
fn test_invalid_config_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_history(dir.path(), 60, "");
    let cfg = TrainingConfig {
        test_fraction: 1.0,
        ..config(&dir, input)
    };
    assert!(matches!(
        TrainingPipeline::new(cfg).run(),
        Err(PipelineError::InvalidConfig(_))
    ));
}
