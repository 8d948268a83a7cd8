use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn chg_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("chg");
    path
}

/// Write a config file into a fresh tempdir. `make_config` receives the
/// tempdir root so state paths can live inside it.
fn setup_test_env(make_config: impl Fn(&Path) -> String) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    let config_path = config_dir.join("chg.toml");
    fs::write(&config_path, make_config(&root)).unwrap();

    (tmp, config_path)
}

fn basic_config(root: &Path) -> String {
    format!(
        r#"[state]
path = "{}/data/chg-state.json"

[poll]
project = "itest"

[[providers]]
type = "null"
name = "busy"
always_modified = true

[[providers]]
type = "null"
name = "quiet"
"#,
        root.display()
    )
}

fn run_chg(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = chg_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run chg binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn state_json(root: &Path) -> serde_json::Value {
    let content = fs::read_to_string(root.join("data").join("chg-state.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[test]
fn test_init_creates_state_file() {
    let (tmp, config_path) = setup_test_env(basic_config);

    let (stdout, stderr, success) = run_chg(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("chg-state.json").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env(basic_config);

    let (_, _, success1) = run_chg(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (stdout2, _, success2) = run_chg(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
    assert!(stdout2.contains("already initialized"));
}

#[test]
fn test_sources_lists_providers_and_slots() {
    let (_tmp, config_path) = setup_test_env(basic_config);

    let (stdout, _, success) = run_chg(&config_path, &["sources"]);
    assert!(success);
    assert!(stdout.contains("busy"));
    assert!(stdout.contains("quiet"));
    assert!(stdout.contains("sc0"));
    assert!(stdout.contains("sc1"));
    assert!(stdout.contains("never"));
}

#[test]
fn test_poll_detects_modifications_and_persists_state() {
    let (tmp, config_path) = setup_test_env(basic_config);

    let (stdout, stderr, success) = run_chg(&config_path, &["poll"]);
    assert!(success, "poll failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("providers polled: 2"));
    assert!(stdout.contains("detected: 1 modifications"));
    assert!(stdout.contains("state slots: 2"));
    assert!(stdout.contains("ok"));

    let state = state_json(tmp.path());
    let slots = state["source_control_data"].as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["name"], "sc0");
    assert_eq!(slots[1]["name"], "sc1");
}

#[test]
fn test_poll_dry_run_persists_nothing() {
    let (tmp, config_path) = setup_test_env(basic_config);

    let (stdout, _, success) = run_chg(&config_path, &["poll", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(!tmp.path().join("data").join("chg-state.json").exists());
}

#[test]
fn test_poll_repeated_results_are_stable() {
    let (_tmp, config_path) = setup_test_env(basic_config);

    let (stdout1, _, _) = run_chg(&config_path, &["poll"]);
    let (stdout2, _, _) = run_chg(&config_path, &["poll"]);
    assert!(stdout1.contains("detected: 1 modifications"));
    assert!(stdout2.contains("detected: 1 modifications"));
}

#[test]
fn test_state_slots_expand_when_provider_list_grows() {
    let (tmp, config_path) = setup_test_env(|root| {
        format!(
            r#"[state]
path = "{}/data/chg-state.json"

[[providers]]
type = "null"
name = "only"
always_modified = true
"#,
            root.display()
        )
    });
    let root = tmp.path();

    let (_, _, success) = run_chg(&config_path, &["poll"]);
    assert!(success);
    assert_eq!(
        state_json(root)["source_control_data"]
            .as_array()
            .unwrap()
            .len(),
        1
    );

    // Grow the provider list; the next poll must expand the slots and
    // keep sc0 in position.
    fs::write(&config_path, basic_config(root)).unwrap();
    let (_, _, success) = run_chg(&config_path, &["poll"]);
    assert!(success);

    let state = state_json(root);
    let slots = state["source_control_data"].as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["name"], "sc0");
    assert_eq!(slots[1]["name"], "sc1");
}

#[test]
fn test_gating_returns_empty_when_any_provider_is_quiet() {
    let (_tmp, config_path) = setup_test_env(|root| {
        format!(
            r#"[state]
path = "{}/data/chg-state.json"

[poll]
require_changes_from_all = true

[[providers]]
type = "null"
name = "busy"
always_modified = true

[[providers]]
type = "null"
name = "quiet"
"#,
            root.display()
        )
    });

    let (stdout, _, success) = run_chg(&config_path, &["poll"]);
    assert!(success);
    assert!(stdout.contains("detected: 0 modifications"));
}

#[test]
fn test_empty_action_filter_rejects_everything() {
    let (_tmp, config_path) = setup_test_env(|root| {
        format!(
            r#"[state]
path = "{}/data/chg-state.json"

[[providers]]
type = "null"
name = "busy"
always_modified = true

[filters]
actions = []
"#,
            root.display()
        )
    });

    let (stdout, _, success) = run_chg(&config_path, &["poll"]);
    assert!(success);
    assert!(stdout.contains("detected: 1 modifications"));
    assert!(stdout.contains("after filters: 0"));
}

#[test]
fn test_issue_tracker_annotates_output() {
    // The null provider's sentinel comment is "always modified"; a regex
    // tracker turns it into an issue link.
    let (_tmp, config_path) = setup_test_env(|root| {
        format!(
            r#"[state]
path = "{}/data/chg-state.json"

[[providers]]
type = "null"
name = "busy"
always_modified = true

[[issue_trackers]]
type = "regex"
find = "always (modified)"
replace = "http://tracker/$1"
"#,
            root.display()
        )
    });

    let (stdout, _, success) = run_chg(&config_path, &["poll"]);
    assert!(success);
    assert!(stdout.contains("[http://tracker/modified]"));
}

#[test]
fn test_failing_provider_aborts_the_poll() {
    let (tmp, config_path) = setup_test_env(|root| {
        format!(
            r#"[state]
path = "{}/data/chg-state.json"

[[providers]]
type = "null"
name = "broken"
fail_get_modifications = true
"#,
            root.display()
        )
    });

    let (_, stderr, success) = run_chg(&config_path, &["poll"]);
    assert!(!success, "poll with a failing provider should fail");
    assert!(
        stderr.contains("source control operation failed"),
        "Should carry the provider failure, got: {}",
        stderr
    );
    assert!(
        !tmp.path().join("data").join("chg-state.json").exists(),
        "a failed poll must not report partial results as success"
    );
}

#[test]
fn test_unknown_provider_type_is_rejected() {
    let (_tmp, config_path) = setup_test_env(|root| {
        format!(
            r#"[state]
path = "{}/data/chg-state.json"

[[providers]]
type = "subversion"
"#,
            root.display()
        )
    });

    let (_, stderr, success) = run_chg(&config_path, &["poll"]);
    assert!(!success, "Unknown provider type should fail");
    assert!(
        stderr.contains("unknown provider type"),
        "Should name the unknown type, got: {}",
        stderr
    );
}

#[test]
fn test_label_fans_out() {
    let (_tmp, config_path) = setup_test_env(basic_config);

    let (stdout, _, success) = run_chg(&config_path, &["label", "build-42"]);
    assert!(success);
    assert!(stdout.contains("labelled build-42"));
}

#[test]
fn test_label_failure_propagates() {
    let (_tmp, config_path) = setup_test_env(|root| {
        format!(
            r#"[state]
path = "{}/data/chg-state.json"

[[providers]]
type = "null"
name = "broken"
fail_label_source_control = true
"#,
            root.display()
        )
    });

    let (_, _, success) = run_chg(&config_path, &["label", "build-42"]);
    assert!(!success, "label with a failing provider should fail");
}

#[test]
fn test_purge_drops_state() {
    let (tmp, config_path) = setup_test_env(basic_config);

    run_chg(&config_path, &["init"]);
    assert!(tmp.path().join("data").join("chg-state.json").exists());

    let (stdout, _, success) = run_chg(&config_path, &["purge"]);
    assert!(success);
    assert!(stdout.contains("purged"));
    assert!(!tmp.path().join("data").join("chg-state.json").exists());
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("config").join("nope.toml");

    let (_, stderr, success) = run_chg(&config_path, &["sources"]);
    assert!(!success);
    assert!(stderr.contains("configuration error"));
}
