use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[pins]
hx711_dt = 5
hx711_sck = 6

[calibration]
tare_samples = 4
tare_interval_ms = 1
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| l.trim_start().starts_with('{'))
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("bad JSON line {l:?}: {e}")))
        .collect()
}

/// Validate the JSONL schema for a simulated place / hold / lift run.
#[rstest]
fn jsonl_event_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("loadcell_cli")
        .unwrap()
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("--simulate")
        .arg("run")
        .arg("--duration-s")
        .arg("3")
        .env("LOADCELL_SIM_LOAD_G", "250")
        .env("LOADCELL_SIM_HOLD_MS", "1200")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lines = json_lines(&out);
    let events: Vec<&serde_json::Value> = lines.iter().filter(|v| v.get("event").is_some()).collect();
    let kinds: Vec<&str> = events.iter().filter_map(|v| v["event"].as_str()).collect();
    assert!(kinds.contains(&"WEIGHT_ADDED"), "events: {kinds:?}");
    assert!(kinds.contains(&"WEIGHT_STABLE"), "events: {kinds:?}");
    assert!(kinds.contains(&"WEIGHT_REMOVED"), "events: {kinds:?}");

    for ev in &events {
        assert!(ev["weight_g"].is_number());
        assert!(ev["timestamp_ms"].is_u64());
        assert!(ev["time"].is_string());
    }
    let stable = events
        .iter()
        .find(|v| v["event"] == "WEIGHT_STABLE")
        .and_then(|v| v["weight_g"].as_f64())
        .unwrap();
    assert!((stable - 250.0).abs() < 5.0, "stable at {stable}");

    let summary = lines
        .iter()
        .find_map(|v| v.get("summary"))
        .expect("summary line");
    assert!(summary["processed"].as_u64().unwrap() > 0);
    assert!(summary["dropped"].is_u64());
}

#[rstest]
fn jsonl_error_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("loadcell_cli")
        .unwrap()
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .arg("--simulate")
        .arg("self-check")
        .env("LOADCELL_SIM_NOT_READY", "1")
        .assert()
        .code(3)
        .get_output()
        .stdout
        .clone();

    let lines = json_lines(&out);
    let err = lines.last().expect("error line");
    assert_eq!(err["reason"], "Timeout");
    assert_eq!(err["code"], 3);
    assert!(err["message"].as_str().unwrap().contains("timed out"));
}

#[rstest]
fn jsonl_calibration_result() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("loadcell_cli")
        .unwrap()
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("--simulate")
        .arg("calibrate")
        .arg("--known-g")
        .arg("200")
        .arg("--settle-s")
        .arg("0")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lines = json_lines(&out);
    let res = lines.last().expect("result line");
    let slope = res["slope"].as_f64().unwrap();
    // simulated cell: 420 counts per gram, 8000 counts at zero
    assert!((slope - 1.0 / 420.0).abs() < 1e-5, "slope {slope}");
    assert!((res["zero_counts"].as_f64().unwrap() - 8000.0).abs() < 40.0);
}
