//! CLI integration tests

use std::fmt::Write as _;
use std::process::{Command, Output};

fn lumen(args: &[&str], dir: &std::path::Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lumen"))
        .args(args)
        .current_dir(dir)
        .env_remove("LUMEN_DEVICE_TOKEN")
        .env_remove("LUMEN_API_URL")
        .env_remove("LUMEN_MODEL_PATH")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = lumen(&["--help"], dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Lumen LED prediction pipeline"), "Should show about text");
    assert!(stdout.contains("export"), "Should show export command");
    assert!(stdout.contains("train"), "Should show train command");
    assert!(stdout.contains("status"), "Should show status command");
    assert!(stdout.contains("predict"), "Should show predict command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let dir = tempfile::tempdir().unwrap();
    let output = lumen(&["--version"], dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("lumen"), "Should show binary name");
}

#[test]
fn test_export_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = lumen(&["export", "--help"], dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for flag in ["--url", "--token", "--keys", "--days", "--output"] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

#[test]
fn test_train_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = lumen(&["train", "--help"], dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for flag in ["--input", "--model", "--min-test-r2", "--trees", "--seed"] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

#[test]
fn test_predict_requires_ldr() {
    let dir = tempfile::tempdir().unwrap();
    let output = lumen(&["predict"], dir.path());

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--ldr"));
}

#[test]
fn test_export_without_token_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = lumen(&["export"], dir.path());

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("device token"), "stderr: {}", stderr);
}

#[test]
fn test_train_with_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = lumen(&["train", "--input", "absent.csv"], dir.path());

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
    assert!(!dir.path().join("led_predictor.json").exists());
}

fn write_history(dir: &std::path::Path) {
    let mut csv = String::from("ts,ldr,motion,led\n");
    for i in 0..120 {
        let ldr = (i * 33) as f64;
        let motion = (i % 2) as f64;
        let led = 240.0 - ldr / 20.0 + motion * 10.0;
        writeln!(csv, "2024-01-01 00:{:02}:{:02}.000,{},{},{}", i / 60, i % 60, ldr, motion, led)
            .unwrap();
    }
    std::fs::write(dir.join("history.csv"), csv).unwrap();
}

#[test]
fn test_train_writes_model_and_json_report() {
    let dir = tempfile::tempdir().unwrap();
    write_history(dir.path());

    let output = lumen(
        &[
            "--format",
            "json",
            "train",
            "--input",
            "history.csv",
            "--model",
            "models/led.json",
            "--trees",
            "15",
        ],
        dir.path(),
    );

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["rows_loaded"], 120);
    assert_eq!(report["sample_predictions"].as_array().unwrap().len(), 5);
    assert!(dir.path().join("models").join("led.json").exists());
}

#[test]
fn test_train_reads_server_model_path_variable() {
    let dir = tempfile::tempdir().unwrap();
    write_history(dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_lumen"))
        .args(["train", "--input", "history.csv", "--trees", "10"])
        .current_dir(dir.path())
        .env("LUMEN_MODEL_PATH", "shared/led.json")
        .output()
        .expect("Failed to execute command");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(dir.path().join("shared").join("led.json").exists());
    assert!(!dir.path().join("led_predictor.json").exists());
}

#[test]
fn test_train_help_mentions_model_path_variable() {
    let dir = tempfile::tempdir().unwrap();
    let output = lumen(&["train", "--help"], dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("LUMEN_MODEL_PATH"));
}
