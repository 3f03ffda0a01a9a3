//! Integration tests for the g74 binary

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn repo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join(relative)
}

/// Engine script that answers every request with a fixed report.
fn write_copy_engine(dir: &Path) -> PathBuf {
    let script = dir.join("engine.sh");
    fs::write(
        &script,
        r#"fixture="$1"
shift
while [ $# -gt 0 ]; do
  case "$1" in
    --report) report="$2"; shift ;;
  esac
  shift
done
cp "$fixture" "$report"
"#,
    )
    .unwrap();
    script
}

#[test]
fn test_config_prints_defaults() {
    cargo_bin_cmd!("g74")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[infeed]"))
        .stdout(predicate::str::contains("x_over_r = 2.76"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = tempdir().unwrap();
    let config = tmp.path().join("g74.toml");
    fs::write(&config, "[infeed]\nx_over_r = -1.0\n").unwrap();

    cargo_bin_cmd!("g74")
        .args(["--config", config.to_str().unwrap(), "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading config"));
}

#[test]
fn test_parse_report_table() {
    let report = repo_path("test_data/reports/breaker_duty_0.06.txt");

    cargo_bin_cmd!("g74")
        .args(["parse-report", report.to_str().unwrap(), "--fault-time", "0.06"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ib sym (kA)"))
        .stdout(predicate::str::contains("1301"))
        .stdout(predicate::str::contains("8.1234"))
        .stderr(predicate::str::contains("Unreliable results at buses 1302, 1303"));
}

#[test]
fn test_parse_report_json() {
    let report = repo_path("test_data/reports/breaker_duty_0.06.txt");

    let output = cargo_bin_cmd!("g74")
        .args(["parse-report", report.to_str().unwrap(), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let table: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(table["records"].as_object().unwrap().len(), 3);
    assert_eq!(table["unit"], "kiloamps");
}

#[test]
fn test_infeed_lists_equivalent_machines() {
    let case = repo_path("test_data/cases/two_bus.json");

    let output = cargo_bin_cmd!("g74")
        .args(["infeed", "--case", case.to_str().unwrap(), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let machines: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let machines = machines.as_array().unwrap();
    assert_eq!(machines.len(), 2);
    assert_eq!(machines[0]["bus"], 1301);
    assert_eq!(machines[0]["tier"], "A");
    assert_eq!(machines[1]["bus"], 1302);
    assert_eq!(machines[1]["tier"], "B");
    assert!((machines[1]["mbase"].as_f64().unwrap() - 5.8).abs() < 1e-9);
}

#[test]
fn test_infeed_missing_case_fails() {
    cargo_bin_cmd!("g74")
        .args(["infeed", "--case", "does/not/exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("loading case"));
}

#[test]
fn test_infeed_rejects_invalid_case() {
    let tmp = tempdir().unwrap();
    let case = tmp.path().join("case.json");
    fs::write(&case, r#"{ "buses": [], "loads": [] }"#).unwrap();

    cargo_bin_cmd!("g74")
        .args(["infeed", "--case", case.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Network has no buses"));
}

#[cfg(unix)]
#[test]
fn test_fault_study_writes_csv() {
    let tmp = tempdir().unwrap();
    let engine = write_copy_engine(tmp.path());
    let fixture = repo_path("test_data/reports/breaker_duty_0.06.txt");
    let case = repo_path("test_data/cases/two_bus.json");
    let work = tmp.path().join("work");
    let out = tmp.path().join("duty.csv");
    let saved = tmp.path().join("saved.json");

    cargo_bin_cmd!("g74")
        .args([
            "fault",
            "--case",
            case.to_str().unwrap(),
            "--engine",
            "sh",
            "--engine-arg",
            engine.to_str().unwrap(),
            "--engine-arg",
            fixture.to_str().unwrap(),
            "--times",
            "0.0001,0.01,0.06",
            "--work-dir",
            work.to_str().unwrap(),
            "--format",
            "csv",
            "-o",
            out.to_str().unwrap(),
            "--save-case",
            saved.to_str().unwrap(),
        ])
        .assert()
        .success();

    let csv = fs::read_to_string(&out).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.starts_with("Bus,Name,Nominal (kV),Pre-fault Voltage (p.u.)"));
    assert!(header.contains("0.06 s | Ib sym (kA)"));
    assert!(header.contains("0.01 s | Ip (kA)"));
    assert!(header.contains("0.0001 s | X/R"));
    assert!(csv.lines().any(|l| l.starts_with("1301,SUBSTN A,33.000")));

    // Reports and case snapshots are removed once used
    let leftover: Vec<_> = fs::read_dir(&work).unwrap().filter_map(Result::ok).collect();
    assert!(leftover.is_empty(), "left in work dir: {leftover:?}");

    let snapshot = fs::read_to_string(&saved).unwrap();
    assert!(snapshot.contains("\"LD\""));
}

#[cfg(unix)]
#[test]
fn test_fault_engine_failure_reports_status() {
    let tmp = tempdir().unwrap();
    let case = repo_path("test_data/cases/two_bus.json");

    cargo_bin_cmd!("g74")
        .args([
            "fault",
            "--case",
            case.to_str().unwrap(),
            "--engine",
            "sh",
            "--engine-arg",
            "-c",
            "--engine-arg",
            "exit 3",
            "--times",
            "0.06",
            "--work-dir",
            tmp.path().join("work").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("returned status 3"));
}

#[test]
fn test_fault_requires_times() {
    cargo_bin_cmd!("g74")
        .args(["fault", "--case", "case.json", "--engine", "engine"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--times"));
}
