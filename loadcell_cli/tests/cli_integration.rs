use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Minimal config for the simulated backend with fast calibration timing
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[pins]
# pins are unused by the simulated backend but must be present
hx711_dt = 5
hx711_sck = 6

[acquisition]
sample_rate_hz = 100

[calibration]
tare_samples = 4
tare_interval_ms = 1
settle_ms = 10
known_samples = 4
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["--simulate", "self-check"], 0, "OK", "stdout")]
#[case(&["--simulate", "calibrate", "--known-g", "100"], 0, "g_per_count", "stdout")]
#[case(&["--simulate", "calibrate", "--known-g", "0"], 1, "must be positive", "stderr")]
#[case(&["--simulate", "run", "--duration-s", "1"], 0, "Stopped", "stdout")]
#[case(&["bogus"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("loadcell_cli").unwrap();
    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn cli_reports_bad_calibration_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("calib.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "raw,value").unwrap();
    writeln!(f, "100,0.0").unwrap();
    writeln!(f, "200,1.0").unwrap();

    let mut cmd = Command::cargo_bin("loadcell_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--calibration")
        .arg(&bad_csv)
        .arg("--simulate")
        .arg("self-check");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
fn cli_rejects_invalid_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, "[pins]\nhx711_dt = 5\nhx711_sck = 5\n").unwrap();

    Command::cargo_bin("loadcell_cli")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("--simulate")
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains("must differ"));
}

#[rstest]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("loadcell_cli")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("self-check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.toml"));
}

#[rstest]
fn hx711_timeout_bubbles_to_cli() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    Command::cargo_bin("loadcell_cli")
        .unwrap()
        .env("LOADCELL_SIM_NOT_READY", "1")
        .arg("--config")
        .arg(&cfg)
        .arg("--simulate")
        .arg("run")
        .arg("--duration-s")
        .arg("1")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("What happened: Scale read timed out"));
}

#[rstest]
fn run_with_calibration_table() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let csv = dir.path().join("calib.csv");
    // matches the simulated cell: 8000 counts at zero, 420 counts per gram
    fs::write(&csv, "raw,grams\n8000,0.0\n50000,100.0\n92000,200.0\n").unwrap();

    Command::cargo_bin("loadcell_cli")
        .unwrap()
        .env("LOADCELL_SIM_LOAD_G", "120")
        .arg("--config")
        .arg(&cfg)
        .arg("--calibration")
        .arg(&csv)
        .arg("--simulate")
        .arg("run")
        .arg("--duration-s")
        .arg("2")
        .assert()
        .success()
        .stdout(predicate::str::contains("WEIGHT_ADDED | "))
        .stdout(predicate::str::contains("WEIGHT_STABLE | "));
}
