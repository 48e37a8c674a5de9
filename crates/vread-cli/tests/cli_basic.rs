//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary HOME, so the
//! SQLite database and config file never touch the real data directory.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_vread-cli"))
        .args(args)
        .env("HOME", home)
        .env_remove("VREAD_ENV")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(home: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "CLI failed for {args:?}: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

fn home() -> TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn validate_then_show() {
    let home = home();
    let first = run_json(
        home.path(),
        &["companion", "validate", "--user", "alice", "--at", "2025-03-12T10:00:00Z"],
    );
    assert_eq!(first["is_first_day"], true);
    assert_eq!(first["companion"]["current_streak"], 1);
    assert_eq!(first["companion"]["current_stage"], 2);

    let next = run_json(
        home.path(),
        &["companion", "validate", "--user", "alice", "--at", "2025-03-13T07:30:00Z"],
    );
    assert_eq!(next["is_first_day"], false);
    assert_eq!(next["companion"]["current_streak"], 2);

    let status = run_json(home.path(), &["companion", "show", "--user", "alice"]);
    assert_eq!(status["companion"]["total_reading_days"], 2);
    assert_eq!(status["stage"]["name"], "Hatchling");
    assert_eq!(status["next_stage"]["id"], 3);
}

#[test]
fn default_user_is_stable() {
    let home = home();
    let a = run_json(home.path(), &["companion", "show"]);
    let b = run_json(home.path(), &["companion", "show"]);
    let id = a["companion"]["user_id"].as_str().unwrap();
    assert!(id.starts_with("reader-"));
    assert_eq!(b["companion"]["user_id"], id);
}

#[test]
fn list_includes_all_users() {
    let home = home();
    run_json(home.path(), &["companion", "show", "--user", "alice"]);
    run_json(home.path(), &["companion", "show", "--user", "bob"]);
    let list = run_json(home.path(), &["companion", "list"]);
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[test]
fn bad_timestamp_fails() {
    let home = home();
    let (_, stderr, code) = run_cli(
        home.path(),
        &["companion", "validate", "--user", "alice", "--at", "yesterday"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("RFC 3339"));
}

#[test]
fn backdated_rejected_when_configured() {
    let home = home();
    let (_, _, code) = run_cli(home.path(), &["config", "set", "progress.backdated_policy", "reject"]);
    assert_eq!(code, 0);

    run_json(
        home.path(),
        &["companion", "validate", "--user", "alice", "--at", "2025-03-12T10:00:00Z"],
    );
    let (_, stderr, code) = run_cli(
        home.path(),
        &["companion", "validate", "--user", "alice", "--at", "2025-03-10T10:00:00Z"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn stages_commands() {
    let home = home();
    let list = run_json(home.path(), &["stages", "list"]);
    assert_eq!(list.as_array().unwrap().len(), 5);

    let progress = run_json(home.path(), &["stages", "progress", "14"]);
    assert_eq!(progress["stage"]["id"], 3);
    assert_eq!(progress["progress"]["progress"], 50);
    assert_eq!(progress["progress"]["days_remaining"], 7);

    let last = run_json(home.path(), &["stages", "progress", "80"]);
    assert!(last["next_stage"].is_null());
    assert!(last["progress"].is_null());
}

#[test]
fn config_get_set_reset() {
    let home = home();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "progress.weekly_reset_clock"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "wall_clock");

    let (_, _, code) = run_cli(
        home.path(),
        &["config", "set", "progress.weekly_reset_clock", "validation_date"],
    );
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "progress.weekly_reset_clock"]);
    assert_eq!(stdout.trim(), "validation_date");

    let (_, _, code) = run_cli(home.path(), &["config", "set", "progress.nope", "1"]);
    assert_ne!(code, 0);
    let (_, _, code) = run_cli(home.path(), &["config", "get", "progress.nope"]);
    assert_ne!(code, 0);

    let (_, _, code) = run_cli(home.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "progress.weekly_reset_clock"]);
    assert_eq!(stdout.trim(), "wall_clock");
}
