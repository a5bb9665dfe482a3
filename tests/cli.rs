use assert_cmd::prelude::*;
use serde_json::{json, Value};
use std::path::Path;
use std::process::Command;

use result_cache::{CacheConfig, ResultCache};
use testpilot_core_types::RequestId;

fn testpilot(config: &Path, cache: &Path) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("testpilot");
    let mut cmd = Command::new(bin);
    cmd.env_remove("RUST_LOG")
        .env_remove("TESTPILOT_MAX_DEPTH")
        .env_remove("TESTPILOT_MAX_BACKTRACKS")
        .env_remove("TESTPILOT_LOCK_TIMEOUT_MS")
        .env("TESTPILOT_CACHE_PATH", cache)
        .arg("--config")
        .arg(config);
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let assert = cmd.assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output")
}

#[test]
fn config_show_applies_environment_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    std::fs::write(&config, "planning:\n  max_depth: 12\n  max_backtracks: 4\n").unwrap();

    let stdout = stdout_of(
        testpilot(&config, &dir.path().join("cache.json"))
            .env("TESTPILOT_MAX_DEPTH", "7")
            .args(["config", "show"]),
    );

    assert!(stdout.contains("max_depth: 7"), "{}", stdout);
    assert!(stdout.contains("max_backtracks: 4"), "{}", stdout);
    assert!(stdout.contains("cache.json"), "{}", stdout);
}

#[test]
fn config_validate_rejects_bad_values() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache.json");

    let missing = dir.path().join("absent.yaml");
    let stdout = stdout_of(testpilot(&missing, &cache).args(["config", "validate"]));
    assert!(stdout.contains("defaults are valid"));

    let config = dir.path().join("config.yaml");
    std::fs::write(&config, "actions:\n  default_wait_ms: 90000\n").unwrap();
    testpilot(&config, &cache)
        .args(["config", "validate"])
        .assert()
        .failure();

    testpilot(&missing, &cache)
        .env("TESTPILOT_MAX_DEPTH", "deep")
        .args(["config", "validate"])
        .assert()
        .failure();
}

#[tokio::test]
async fn cache_maintenance_commands() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    let cache_path = dir.path().join("cache.json");

    let cache = ResultCache::new(CacheConfig::new(&cache_path));
    let run_a = RequestId::from("run-a");
    let run_b = RequestId::from("run-b");
    cache.set("k1", json!(1), &run_a).await;
    cache.set("k2", json!(2), &run_a).await;
    cache.set("k3", json!(3), &run_b).await;

    let stdout = stdout_of(testpilot(&config, &cache_path).args(["cache", "stats", "--json"]));
    let stats: Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(stats["entries"], 3);
    assert_eq!(stats["request_ids"], 2);

    let stdout = stdout_of(
        testpilot(&config, &cache_path).args(["cache", "purge", "--request-id", "run-a"]),
    );
    assert!(stdout.contains("Removed 2 entries"), "{}", stdout);

    let stdout =
        stdout_of(testpilot(&config, &cache_path).args(["cache", "delete", "--key", "k3"]));
    assert!(stdout.contains("Deleted k3"), "{}", stdout);
    let stdout =
        stdout_of(testpilot(&config, &cache_path).args(["cache", "delete", "--key", "k3"]));
    assert!(stdout.contains("No entry for k3"), "{}", stdout);

    cache.set("k4", json!(4), &run_b).await;
    stdout_of(testpilot(&config, &cache_path).args(["cache", "reset"]));
    assert_eq!(cache.stats().await.unwrap().entries, 0);

    let stdout = stdout_of(testpilot(&config, &cache_path).args(["cache", "sweep"]));
    assert!(stdout.contains("Removed 0 stale entries"), "{}", stdout);
}

#[test]
fn info_reports_build_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let stdout = stdout_of(
        testpilot(&dir.path().join("config.yaml"), &dir.path().join("cache.json")).arg("info"),
    );
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    assert!(stdout.contains("Git Commit:"));
}
