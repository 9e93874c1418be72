use std::fs::File;
use std::io::Write;

use loadcell_config::{CalibrationRow, load_calibration_csv};
use rstest::rstest;
use tempfile::tempdir;

fn write_csv(lines: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("calibration.csv");
    let mut f = File::create(&path).unwrap();
    for l in lines {
        writeln!(f, "{l}").unwrap();
    }
    (dir, path)
}

#[test]
fn reads_rows_in_file_order() {
    let (_dir, path) = write_csv(&["raw,grams", "842913,0.0", "1024913, 100.0", "-5,2.5"]);
    let rows = load_calibration_csv(&path).unwrap();
    assert_eq!(
        rows,
        vec![
            CalibrationRow {
                raw: 842_913,
                grams: 0.0
            },
            CalibrationRow {
                raw: 1_024_913,
                grams: 100.0
            },
            CalibrationRow { raw: -5, grams: 2.5 },
        ]
    );
}

#[rstest]
#[case(&["raw,value", "100,0.0", "200,1.0"], "headers")]
#[case(&["raw,grams", "abc,xyz"], "invalid csv row 2")]
#[case(&["raw,grams", "100,0.0"], "at least two rows")]
#[case(&["raw,grams", "100,0.0", "100,50.0"], "share raw value")]
#[case(&["raw,grams", "100,0.0", "200,NaN"], "finite")]
fn rejects_bad_tables(#[case] lines: &[&str], #[case] needle: &str) {
    let (_dir, path) = write_csv(lines);
    let err = load_calibration_csv(&path).expect_err("should fail");
    let msg = format!("{err}").to_lowercase();
    assert!(msg.contains(needle), "expected {needle:?} in {msg:?}");
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = load_calibration_csv(&dir.path().join("nope.csv")).expect_err("missing");
    assert!(format!("{err}").contains("open calibration CSV"));
}
