use loadcell_config::{FilterMode, load_toml};
use rstest::rstest;

const PINS: &str = r#"
[pins]
hx711_dt = 5
hx711_sck = 6
"#;

fn cfg_with(extra: &str) -> loadcell_config::Config {
    load_toml(&format!("{PINS}\n{extra}")).expect("parse TOML")
}

#[test]
fn minimal_config_uses_defaults() {
    let cfg = cfg_with("");
    cfg.validate().expect("defaults must validate");
    assert_eq!(cfg.pins.gain, 128);
    assert_eq!(cfg.acquisition.sample_rate_hz, 100);
    assert_eq!(cfg.acquisition.queue_capacity, 10);
    assert_eq!(cfg.filter.mode, FilterMode::Smoothing);
    assert_eq!(cfg.filter.ma_window, 8);
    assert!((cfg.filter.boost.step_threshold - 1000.0).abs() < f32::EPSILON);
    assert_eq!(cfg.filter.boost.samples, 5);
    assert_eq!(cfg.auto_tare.count, 50);
    assert_eq!(cfg.detection.stable_readings_required, 3);
    assert_eq!(cfg.detection.removal_confirmation_ms, 500);
    assert!((cfg.manager.wake_threshold_g - 20.0).abs() < f32::EPSILON);
    assert_eq!(cfg.manager.active_timeout_ms, 60_000);
    assert_eq!(cfg.calibration.tare_samples, 16);
    assert!(cfg.calibration.g_per_count.is_none());
}

#[test]
fn missing_pins_is_a_parse_error() {
    assert!(load_toml("[acquisition]\nsample_rate_hz = 10\n").is_err());
}

#[test]
fn median_mode_and_disabled_windows_parse() {
    let cfg = cfg_with(
        r#"
[filter]
mode = "median"
ma_window = 0

[filter.median]
min_samples = 5
max_samples = 9
"#,
    );
    cfg.validate().expect("valid");
    assert_eq!(cfg.filter.mode, FilterMode::Median);
    assert_eq!(cfg.filter.ma_window, 0);
    assert_eq!(cfg.filter.median.max_samples, 9);
}

#[test]
fn unknown_filter_mode_is_rejected() {
    let err = load_toml(&format!("{PINS}\n[filter]\nmode = \"both\"\n"));
    assert!(err.is_err());
}

#[rstest]
#[case("[pins]\nhx711_dt = 5\nhx711_sck = 5\n", "must differ")]
#[case("[pins]\nhx711_dt = 5\nhx711_sck = 6\ngain = 100\n", "pins.gain")]
#[case(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\n[acquisition]\nsample_rate_hz = 0\n",
    "sample_rate_hz must be > 0"
)]
#[case(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\n[acquisition]\nqueue_capacity = 0\n",
    "queue_capacity"
)]
#[case(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\n[acquisition]\nqueue_capacity = 9223372036854775807\n",
    "queue_capacity must be <= 1024"
)]
#[case(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\n[filter]\nma_window = 2000000000\n",
    "filter.ma_window must be <= 1024"
)]
#[case(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\n[filter.median]\nmax_samples = 1025\n",
    "filter.median.max_samples must be <= 1024"
)]
#[case(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\n[calibration]\ntare_samples = 1000000\n",
    "calibration.tare_samples"
)]
#[case(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\n[filter.kalman]\nq_min = 2.0\nq_max = 1.0\n",
    "q_min"
)]
#[case(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\n[filter]\nmode = \"median\"\n[filter.median]\nmax_samples = 0\n",
    "requires filter.median.max_samples"
)]
#[case(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\n[manager]\nwake_threshold_g = 5.0\nsleep_threshold_g = 10.0\n",
    "sleep_threshold_g must be <="
)]
#[case(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\n[manager]\ndebounce_count = 0\n",
    "debounce_count"
)]
#[case(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\n[detection]\nchange_threshold_pct = 0.0\n",
    "change_threshold_pct"
)]
#[case(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\n[calibration]\ng_per_count = 0.0\n",
    "g_per_count"
)]
#[case(
    "[pins]\nhx711_dt = 5\nhx711_sck = 6\n[logging]\nrotation = \"weekly\"\n",
    "logging.rotation"
)]
fn validation_rejects(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    let msg = format!("{err}");
    assert!(msg.contains(needle), "expected {needle:?} in {msg:?}");
}

#[test]
fn largest_allowed_windows_pass() {
    let cfg = cfg_with(
        "[acquisition]\nqueue_capacity = 1024\n[filter]\nma_window = 1024\n[filter.median]\nmax_samples = 1024\n",
    );
    cfg.validate().expect("bounds are inclusive");
}

#[test]
fn default_kalman_bounds_contain_seed_and_normal_q() {
    let cfg = cfg_with("");
    let k = &cfg.filter.kalman;
    assert!((k.q_max - 1.0).abs() < f32::EPSILON);
    assert!((k.q_min..=k.q_max).contains(&k.q));
    assert!((k.q_min..=k.q_max).contains(&cfg.filter.boost.normal_q));
}
