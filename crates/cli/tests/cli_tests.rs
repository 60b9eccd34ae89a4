//! CLI integration tests

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const AS_OF: &str = "2024-06-30";

fn cco(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cco"))
        .args(args)
        // Keep the user's config file out of the tests
        .env("HOME", std::env::temp_dir())
        .env_remove("CCO_INVENTORY")
        .output()
        .expect("Failed to execute command")
}

fn daily(resource_id: &str, days: u32, cost: f64) -> Vec<Value> {
    (0..days)
        .map(|d| {
            json!({
                "resource_id": resource_id,
                "date": format!("2024-06-{:02}", 30 - d),
                "cost": cost,
            })
        })
        .collect()
}

fn write_inventory(dir: &Path) -> PathBuf {
    let mut records = daily("db-orders", 29, 100.0);
    records.extend(daily("vm-idle", 10, 5.0));
    records.extend(daily("vm-new", 2, 3.0));

    let inventory = json!({
        "resources": [
            {
                "id": "db-orders",
                "provider": "aws",
                "resource_type": "database",
                "name": "prod-orders-db",
                "tags": { "environment": "production" }
            },
            {
                "id": "vm-idle",
                "provider": "aws",
                "resource_type": "ec2",
                "name": "legacy-report",
                "specifications": {
                    "avg_cpu_utilization": 1.0,
                    "avg_network_utilization": 0.5,
                    "last_activity_days": 45
                }
            },
            {
                "id": "vm-new",
                "provider": "aws",
                "resource_type": "ec2",
                "name": "fresh"
            }
        ],
        "cost_records": records,
    });

    let path = dir.join("inventory.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&inventory).unwrap()).unwrap();
    path
}

fn setup() -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_inventory(dir.path());
    (dir, path.to_string_lossy().into_owned())
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = cco(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Cloud Cost Optimizer"), "Should show app name");
    assert!(stdout.contains("run"), "Should show run command");
    assert!(stdout.contains("features"), "Should show features command");
    assert!(stdout.contains("risk"), "Should show risk command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = cco(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("cco"), "Should show binary name");
}

#[test]
fn test_run_help_lists_options() {
    let output = cco(&["run", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for flag in ["--resource", "--output", "--min-confidence", "--no-risk"] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

#[test]
fn test_run_json_report() {
    let (_dir, inventory) = setup();
    let output = cco(&["-i", &inventory, "--as-of", AS_OF, "-f", "json", "run"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report = stdout_json(&output);
    assert_eq!(report["status"], "success");

    let recs = report["recommendations"].as_array().unwrap();
    let kinds: Vec<&str> = recs
        .iter()
        .map(|r| r["action"]["type"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"unused_resource"));
    assert!(recs.iter().all(|r| r["resource_id"] != "vm-new"));
    assert_eq!(
        report["summary"]["data_processing"]["resources_skipped"],
        1
    );
}

#[test]
fn test_run_table_output() {
    let (_dir, inventory) = setup();
    let output = cco(&["-i", &inventory, "--as-of", AS_OF, "run"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("vm-idle"));
    assert!(stdout.contains("potential monthly savings"));
}

#[test]
fn test_run_writes_output_file() {
    let (dir, inventory) = setup();
    let out = dir.path().join("recs.json");
    let out_arg = out.to_string_lossy().into_owned();

    let output = cco(&["-i", &inventory, "--as-of", AS_OF, "run", "-o", &out_arg]);
    assert!(output.status.success());

    let stored: Vec<Value> = serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
    assert!(!stored.is_empty());

    // A second run yields the same ids, which replace the stored ones
    let output = cco(&["-i", &inventory, "--as-of", AS_OF, "run", "-o", &out_arg]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains(&format!("Wrote 0 new and updated {}", stored.len())));
    assert!(!stdout.contains("Rejected"));
    let again: Vec<Value> = serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
    assert_eq!(again.len(), stored.len());
}

#[test]
fn test_run_with_missing_inventory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    let output = cco(&["-i", &missing.to_string_lossy(), "run"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Data ingestion failed"));
}

#[test]
fn test_features_json() {
    let (_dir, inventory) = setup();
    let output = cco(&["-i", &inventory, "--as-of", AS_OF, "-f", "json", "features"]);

    assert!(output.status.success());
    let rows = stdout_json(&output);
    let ids: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["features"]["resource_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["db-orders", "vm-idle"]);
}

#[test]
fn test_risk_for_production_database() {
    let (_dir, inventory) = setup();
    let output = cco(&[
        "-i",
        &inventory,
        "--as-of",
        AS_OF,
        "-f",
        "json",
        "risk",
        "db-orders",
        "--action",
        "reserved-capacity",
    ]);

    assert!(output.status.success());
    let assessment = stdout_json(&output);
    assert_eq!(assessment["risk_level"], "high");
    assert_eq!(assessment["requires_approval"], true);
}

#[test]
fn test_risk_unknown_resource_fails() {
    let (_dir, inventory) = setup();
    let output = cco(&["-i", &inventory, "risk", "does-not-exist"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}
