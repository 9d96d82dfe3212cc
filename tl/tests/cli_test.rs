//! CLI tests for the `tl` binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `tl` isolated from the user's config and log directories
fn tl(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tl").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    tl(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("simulate"))
        .stdout(predicate::str::contains("ledger"));
}

#[test]
fn test_simulate_converges_and_writes_snapshot() {
    let home = TempDir::new().unwrap();
    let output = home.path().join("out");

    tl(home.path())
        .args(["simulate", "--pipeline", "scaffold", "--scores", "0.5,0.9", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("CONVERGED"))
        .stdout(predicate::str::contains("Iterations:"));

    assert!(output.join("ledger.json").exists());
    assert!(home.path().join(".local/share/twoloop/logs/twoloop.log").exists());
}

#[test]
fn test_simulate_json_result() {
    let home = TempDir::new().unwrap();
    let output = home.path().join("out");

    let assert = tl(home.path())
        .args(["simulate", "--scores", "0.5,0.6,0.7", "--format", "json", "--output"])
        .arg(&output)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["success"], true);
    assert_eq!(result["quality_achieved"], false);
    assert_eq!(result["target_quality"], 0.85);
    assert_eq!(result["iterations_completed"], 5);
}

#[test]
fn test_simulate_generator_failure() {
    let home = TempDir::new().unwrap();
    let output = home.path().join("out");

    tl(home.path())
        .args(["simulate", "--scores", "0.9", "--fail-generator", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains("simulated generator failure"));

    tl(home.path())
        .args(["ledger", "status"])
        .arg(output.join("ledger.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("failed"));
}

#[test]
fn test_ledger_show_and_status() {
    let home = TempDir::new().unwrap();
    let output = home.path().join("out");

    tl(home.path())
        .args(["simulate", "--scores", "0.5,0.9", "--project-name", "Quarterly deck", "--output"])
        .arg(&output)
        .assert()
        .success();
    let snapshot = output.join("ledger.json");

    tl(home.path())
        .args(["ledger", "show"])
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Quarterly deck"))
        .stdout(predicate::str::contains("## Task Knowledge"))
        .stdout(predicate::str::contains("## Progress"))
        .stdout(predicate::str::contains("scripted-reviewer:review"));

    let assert = tl(home.path())
        .args(["ledger", "status", "--format", "json"])
        .arg(&snapshot)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let status: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["state"], "converged");
    assert_eq!(status["current_iteration"], 2);
    assert_eq!(status["best_quality_score"], 0.9);
}

#[test]
fn test_simulate_with_improvements() {
    let home = TempDir::new().unwrap();
    let output = home.path().join("out");

    tl(home.path())
        .args(["simulate", "--pipeline", "scaffold", "--scores", "0.5,0.9", "--request-improvements", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("CONVERGED"));

    tl(home.path())
        .args(["ledger", "show"])
        .arg(output.join("ledger.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("scripted-improver:improve"))
        .stdout(predicate::str::contains("scripted-reviewer:re_review"));
}

#[test]
fn test_ledger_status_reports_exhausted_run() {
    let home = TempDir::new().unwrap();
    let output = home.path().join("out");

    tl(home.path())
        .args(["simulate", "--scores", "0.5,0.6,0.7", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("NOT CONVERGED"));

    tl(home.path())
        .args(["ledger", "status"])
        .arg(output.join("ledger.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("exhausted"));
}

#[test]
fn test_ledger_show_missing_file() {
    let home = TempDir::new().unwrap();
    tl(home.path())
        .args(["ledger", "show", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load ledger"));
}

#[test]
fn test_config_uses_local_override() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join(".twoloop.yml"),
        "pipelines:\n  scaffold:\n    max_iterations: 7\n",
    )
    .unwrap();

    tl(home.path())
        .args(["config", "--pipeline", "scaffold"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_iterations: 7"))
        .stdout(predicate::str::contains("presentation").not());

    tl(home.path())
        .args(["config", "--pipeline", "presentation"])
        .assert()
        .success()
        .stdout(predicate::str::contains("target_quality: 0.85"))
        .stdout(predicate::str::contains("narrative"));
}
