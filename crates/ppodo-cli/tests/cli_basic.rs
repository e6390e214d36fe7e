//! Basic CLI E2E tests.
//!
//! Tests run the compiled `ppodo` binary against a throwaway data directory
//! and verify its JSON output.

use serde_json::Value;
use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_ppodo"))
        .args(args)
        .env("PPODO_HOME", home)
        .env_remove("PPODO_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

/// Run a command that must succeed and parse its JSON output.
fn run_json(home: &Path, args: &[&str]) -> Value {
    let (code, stdout, stderr) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("{args:?}: bad JSON ({e}): {stdout}"))
}

fn home() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

#[test]
fn test_task_add_and_list() {
    let dir = home();
    let task = run_json(dir.path(), &["task", "add", "Write report"]);
    assert_eq!(task["title"], "Write report");
    assert_eq!(task["completed"], false);

    run_json(dir.path(), &["task", "add", "Read"]);
    let tasks = run_json(dir.path(), &["task", "list"]);
    let titles: Vec<&str> = tasks
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Read", "Write report"]);
}

#[test]
fn test_task_add_rejects_blank_title() {
    let dir = home();
    let (code, _, stderr) = run_cli(dir.path(), &["task", "add", "   "]);
    assert_eq!(code, 1);
    assert!(stderr.contains("must not be empty"), "{stderr}");
}

#[test]
fn test_task_complete_and_filter() {
    let dir = home();
    let id = run_json(dir.path(), &["task", "add", "Done soon"])["id"]
        .as_i64()
        .unwrap()
        .to_string();
    run_json(dir.path(), &["task", "add", "Later"]);

    let done = run_json(dir.path(), &["task", "complete", &id]);
    assert_eq!(done["changed"], true);
    let again = run_json(dir.path(), &["task", "complete", &id]);
    assert_eq!(again["changed"], false);

    let open = run_json(dir.path(), &["task", "list", "--filter", "incomplete"]);
    assert_eq!(open.as_array().unwrap().len(), 1);
    assert_eq!(open[0]["title"], "Later");
}

#[test]
fn test_session_complete_collects_first_grape() {
    let dir = home();
    let session = run_json(dir.path(), &["session", "start", "--minutes", "25"]);
    assert!(session["ended_at"].is_null());

    let report = run_json(dir.path(), &["session", "complete"]);
    assert_eq!(report["session"]["rewarded"], true);
    assert_eq!(report["reward"]["xp_gained"], 10);
    assert_eq!(report["new_badges"][0]["name"], "첫 걸음");

    let profile = run_json(dir.path(), &["profile"]);
    assert_eq!(profile["total_grapes"], 1);
    assert_eq!(profile["experience"], 10);
    assert_eq!(profile["level"], 1);
    assert_eq!(profile["streak_days"], 1);
}

#[test]
fn test_short_and_abandoned_sessions_earn_nothing() {
    let dir = home();
    run_json(dir.path(), &["session", "start", "--minutes", "10"]);
    let report = run_json(dir.path(), &["session", "complete"]);
    assert!(report["reward"].is_null());

    run_json(dir.path(), &["session", "start"]);
    let outcome = run_json(dir.path(), &["session", "abandon"]);
    assert_eq!(outcome["session"]["completed"], true);
    assert!(outcome["reward"].is_null());

    let profile = run_json(dir.path(), &["profile"]);
    assert_eq!(profile["total_grapes"], 0);
    assert!(run_json(dir.path(), &["session", "status"]).is_null());
}

#[test]
fn test_second_open_session_is_rejected() {
    let dir = home();
    run_json(dir.path(), &["session", "start"]);
    let (code, _, stderr) = run_cli(dir.path(), &["session", "start"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("still open"), "{stderr}");
}

#[test]
fn test_timer_lifecycle() {
    let dir = home();
    let started = run_json(dir.path(), &["timer", "start", "--minutes", "25"]);
    assert_eq!(started["events"][0]["type"], "FocusStarted");
    assert_eq!(started["status"]["timer"]["state"], "focus");

    let paused = run_json(dir.path(), &["timer", "pause"]);
    assert_eq!(paused["status"]["timer"]["state"], "paused");
    assert_eq!(paused["status"]["timer"]["phase"], "focus");

    let (code, _, _) = run_cli(dir.path(), &["timer", "pause"]);
    assert_eq!(code, 1);

    run_json(dir.path(), &["timer", "resume"]);
    let stopped = run_json(dir.path(), &["timer", "stop"]);
    assert_eq!(stopped["abandoned"]["session"]["rewarded"], false);
    assert_eq!(stopped["status"]["timer"]["state"], "idle");

    let profile = run_json(dir.path(), &["profile"]);
    assert_eq!(profile["total_grapes"], 0);
}

#[test]
fn test_stats_and_badges() {
    let dir = home();
    let badges = run_json(dir.path(), &["badge", "list"]);
    assert_eq!(badges.as_array().unwrap().len(), 15);
    assert!(run_json(dir.path(), &["badge", "check"])
        .as_array()
        .unwrap()
        .is_empty());

    let week = run_json(dir.path(), &["stats", "weekly", "--days", "3"]);
    assert_eq!(week.as_array().unwrap().len(), 3);

    let today = run_json(dir.path(), &["stats", "today"]);
    assert_eq!(today["grapes_earned"], 0);
    assert!(run_json(dir.path(), &["stats", "distribution"])
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn test_config_get_set_reset() {
    let dir = home();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "ui.language"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ko");

    run_json(dir.path(), &["config", "set", "ui.language", "en"]);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "ui.language"]);
    assert_eq!(stdout.trim(), "en");

    let (code, _, stderr) = run_cli(dir.path(), &["config", "set", "ui.language", "fr"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unsupported language"), "{stderr}");

    let list = run_json(dir.path(), &["config", "list"]);
    assert_eq!(list["timer.focus_minutes"], "25");

    run_json(dir.path(), &["config", "reset"]);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "ui.language"]);
    assert_eq!(stdout.trim(), "ko");
}
