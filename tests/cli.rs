//! End-to-end tests driving the `courier` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn courier_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("courier");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("pickup")).unwrap();
    fs::create_dir_all(root.join("dropoff")).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/courier.sqlite"

[engine]
interval_secs = 60
"#,
        root.display()
    );

    let config_path = root.join("courier.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_courier(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = courier_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run courier binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_courier(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_courier(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_courier(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_rules_add_and_list() {
    let (tmp, config_path) = setup_test_env();
    run_courier(&config_path, &["init"]);

    let pickup = tmp.path().join("pickup");
    let dropoff = tmp.path().join("dropoff");
    let (stdout, stderr, success) = run_courier(
        &config_path,
        &[
            "rules",
            "add",
            "--location",
            "atm",
            "--pickup",
            pickup.to_str().unwrap(),
            "--dropoff",
            dropoff.to_str().unwrap(),
        ],
    );
    assert!(success, "rules add failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Added rule 1"));

    let (stdout, _, success) = run_courier(&config_path, &["rules", "list"]);
    assert!(success);
    assert!(stdout.contains("atm"));
    assert!(stdout.contains("true"));
}

#[test]
fn test_run_once_with_no_rules_succeeds() {
    let (_tmp, config_path) = setup_test_env();
    run_courier(&config_path, &["init"]);

    let (stdout, stderr, success) = run_courier(&config_path, &["run", "--once"]);
    assert!(
        success,
        "run --once failed: stdout={}, stderr={}",
        stdout, stderr
    );
}

#[test]
fn test_run_once_happy_path() {
    let (tmp, config_path) = setup_test_env();
    run_courier(&config_path, &["init"]);

    let pickup = tmp.path().join("pickup");
    let dropoff = tmp.path().join("dropoff");
    run_courier(
        &config_path,
        &[
            "rules",
            "add",
            "--location",
            "atm",
            "--pickup",
            pickup.to_str().unwrap(),
            "--dropoff",
            dropoff.to_str().unwrap(),
        ],
    );

    fs::write(pickup.join("run-atmc-1.dat"), b"payload").unwrap();
    fs::write(pickup.join("unrelated.dat"), b"ignored").unwrap();

    let (stdout, stderr, success) = run_courier(&config_path, &["run", "--once"]);
    assert!(
        success,
        "run --once failed: stdout={}, stderr={}",
        stdout, stderr
    );

    assert!(dropoff.join("run-atmc-1.dat").exists());
    assert!(!dropoff.join("unrelated.dat").exists());

    let (stdout, _, success) = run_courier(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Files moved: 1"), "stats was: {}", stdout);
}

#[test]
fn test_recover_requires_window() {
    let (_tmp, config_path) = setup_test_env();
    run_courier(&config_path, &["init"]);

    let (_, stderr, success) = run_courier(&config_path, &["recover"]);
    assert!(!success);
    assert!(stderr.contains("recovery window"), "stderr was: {}", stderr);
}
