//! CLI integration tests for the Tempo command-line interface.
//!
//! Every test points the user config directory at a temp dir so nothing on
//! the host is read or written. Turns run with a fast timing config.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const FAST_CONFIG: &str = r#"
[pacer]
chars_per_tick = 50
tick_interval_ms = 1
frame_interval_ms = 1

[feed]
min_chunk_chars = 40
max_chunk_chars = 80
min_delay_ms = 1
max_delay_ms = 2

[sequencer]
min_step_ms = 1
max_step_ms = 2
clear_after_ms = 1
"#;

const ANSWER_OPENING: &str =
    "Under the Tenancy Act, a tenant may terminate an open-ended lease with three months' notice [1].";

/// Get a command for the tempo binary, isolated in `home`.
fn tempo(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tempo").unwrap();
    cmd.current_dir(home.path())
        .env("TEMPO_CONFIG_DIR", home.path().join("config"))
        .env_remove("TEMPO_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn fast_config(home: &TempDir) -> PathBuf {
    let path = home.path().join("fast.toml");
    std::fs::write(&path, FAST_CONFIG).unwrap();
    path
}

fn ask(home: &TempDir, config: &Path) -> Command {
    let mut cmd = tempo(home);
    cmd.arg("--config").arg(config).arg("ask");
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    tempo(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("paced streaming"))
        .stdout(predicate::str::contains("tui"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let home = TempDir::new().unwrap();
    tempo(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tempo"));
}

#[test]
fn test_missing_subcommand_fails() {
    let home = TempDir::new().unwrap();
    tempo(&home).assert().failure();
}

#[test]
fn test_ask_requires_prompt() {
    let home = TempDir::new().unwrap();
    tempo(&home).arg("ask").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Ask
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_ask_streams_steps_answer_and_sources() {
    let home = TempDir::new().unwrap();
    let config = fast_config(&home);
    ask(&home, &config)
        .args(["How long is the notice period on my lease?", "--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓"))
        .stdout(predicate::str::contains("three months"))
        .stdout(predicate::str::contains("Sources:"))
        .stdout(predicate::str::contains("[1] Tenancy Act, chapter 12"));
}

#[test]
fn test_ask_json_reports_complete_message() {
    let home = TempDir::new().unwrap();
    let config = fast_config(&home);
    let output = ask(&home, &config)
        .args(["Can my landlord evict me?", "--json", "--seed", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["category"], "legal");
    assert_eq!(value["message"]["role"], "assistant");
    assert_eq!(value["message"]["status"], "complete");
    assert_eq!(value["cited_sources"].as_array().unwrap().len(), 3);
}

#[test]
fn test_ask_with_attachment_is_document_analysis() {
    let home = TempDir::new().unwrap();
    let config = fast_config(&home);
    let output = ask(&home, &config)
        .args(["What does this say?", "--attach", "lease.pdf", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["category"], "document");
}

#[test]
fn test_ask_failure_keeps_partial_text() {
    let home = TempDir::new().unwrap();
    let config = fast_config(&home);
    let output = ask(&home, &config)
        .args(["Can my landlord evict me?", "--json", "--fail-after", "60"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Response failed"));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["message"]["status"], "error");
    let content = value["message"]["content"].as_str().unwrap();
    // frozen at whatever had been revealed, never past the delivered 60
    assert!(content.chars().count() <= 60);
    assert!(ANSWER_OPENING.starts_with(content));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_env_dir() {
    let home = TempDir::new().unwrap();
    tempo(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains(
            home.path().join("config").display().to_string(),
        ));
}

#[test]
fn test_config_init_then_show() {
    let home = TempDir::new().unwrap();
    tempo(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    assert!(home.path().join("config/config.toml").exists());

    tempo(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    tempo(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Loaded:"))
        .stdout(predicate::str::contains("[pacer]"))
        .stdout(predicate::str::contains("chars_per_tick = 1"));
}

#[test]
fn test_config_init_local() {
    let home = TempDir::new().unwrap();
    tempo(&home)
        .args(["config", "init", "--local"])
        .assert()
        .success();
    assert!(home.path().join("tempo.toml").exists());
}

#[test]
fn test_config_show_warns_on_bad_range() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("bad.toml");
    std::fs::write(&path, "[sequencer]\nmin_step_ms = 900\nmax_step_ms = 100\n").unwrap();

    tempo(&home)
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Warning: Invalid configuration"))
        .stdout(predicate::str::contains("min_step_ms = 800"));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let home = TempDir::new().unwrap();
    tempo(&home)
        .args(["--config", "nope.toml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.toml"));
}
