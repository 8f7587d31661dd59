//! Corruption recovery tests for the liftlog binary.
//!
//! These tests verify the system can handle:
//! - Torn journal lines from a crash mid-append
//! - Missing files
//! - Corrupted snapshot and backup files

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write as IoWrite;
use std::path::Path;
use tempfile::TempDir;

fn cli(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("liftlog").expect("Failed to find liftlog binary");
    cmd.env("XDG_CONFIG_HOME", home.join("config"));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn log_cardio(home: &Path, data_dir: &Path, minutes: &str) {
    cli(home)
        .arg("--data-dir")
        .arg(data_dir)
        .args(["cardio", "--type", "row", "--minutes", minutes])
        .assert()
        .success();
}

#[test]
fn test_partial_journal_line() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");

    log_cardio(temp_dir.path(), &data_dir, "12");

    // Simulate a crash during the next append
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(data_dir.join("store.wal"))
        .unwrap();
    write!(file, r#"{{"op":"cardio_saved","session":{{"id":"#).unwrap();
    drop(file);

    cli(temp_dir.path())
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("recent")
        .assert()
        .success()
        .stdout(predicate::str::contains("Row 12 min"));

    // Later appends are not swallowed by the torn tail
    log_cardio(temp_dir.path(), &data_dir, "25");

    cli(temp_dir.path())
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("recent")
        .assert()
        .success()
        .stdout(predicate::str::contains("Row 12 min"))
        .stdout(predicate::str::contains("Row 25 min"));
}

#[test]
fn test_garbage_journal_lines_ignored() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();

    fs::write(data_dir.join("store.wal"), "{ invalid json }\n{ more invalid }\n").unwrap();

    cli(temp_dir.path())
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("exercises")
        .assert()
        .success()
        .stdout(predicate::str::contains("Barbell Bench Press"));
}

#[test]
fn test_empty_files() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();

    fs::write(data_dir.join("store.wal"), "").unwrap();

    cli(temp_dir.path())
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("recent")
        .assert()
        .success()
        .stdout(predicate::str::contains("No activity logged yet."));
}

#[test]
fn test_corrupted_snapshot_is_reported() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();

    fs::write(data_dir.join("store.json"), "{ not valid json at all }").unwrap();

    // The snapshot is never silently replaced
    cli(temp_dir.path())
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("recent")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Json"));

    assert_eq!(
        fs::read_to_string(data_dir.join("store.json")).unwrap(),
        "{ not valid json at all }"
    );
}

#[test]
fn test_malformed_backup_changes_nothing() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    let backup = temp_dir.path().join("broken.json");

    log_cardio(temp_dir.path(), &data_dir, "12");
    let before = fs::read_to_string(data_dir.join("store.wal")).unwrap();

    fs::write(&backup, r#"{"schemaVersion": 1, "exercises": ["#).unwrap();

    cli(temp_dir.path())
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("import")
        .arg(&backup)
        .assert()
        .failure();

    assert_eq!(fs::read_to_string(data_dir.join("store.wal")).unwrap(), before);
}

#[test]
fn test_invalid_backup_record_rejects_whole_import() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    let backup = temp_dir.path().join("invalid.json");

    fs::write(
        &backup,
        r#"{
  "schemaVersion": 1,
  "exportedAt": "2024-01-01T00:00:00Z",
  "exercises": [],
  "workouts": [],
  "cardioSessions": [
    {"id": "6a1f6f8e-2c4b-4f7e-9d0a-1b2c3d4e5f60", "type": "run", "durationMinutes": 30, "completedAt": "2024-01-01T07:00:00Z"},
    {"id": "6a1f6f8e-2c4b-4f7e-9d0a-1b2c3d4e5f61", "type": "run", "durationMinutes": 0, "completedAt": "2024-01-02T07:00:00Z"}
  ]
}"#,
    )
    .unwrap();

    cli(temp_dir.path())
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("import")
        .arg(&backup)
        .assert()
        .failure()
        .stderr(predicate::str::contains("durationMinutes"));

    cli(temp_dir.path())
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("recent")
        .assert()
        .success()
        .stdout(predicate::str::contains("No activity logged yet."));
}
