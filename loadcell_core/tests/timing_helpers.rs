// Sampling period and relative-change helpers.
use loadcell_core::util::{pct_change, period_us};
use rstest::rstest;

#[rstest]
#[case(0, 1_000_000)] // zero is treated as 1 Hz
#[case(1, 1_000_000)]
#[case(80, 12_500)]
#[case(100, 10_000)]
#[case(1_000_000, 1)]
#[case(u32::MAX, 1)]
fn period_us_clamps_and_floors(#[case] hz: u32, #[case] expected: u64) {
    assert_eq!(period_us(hz), expected);
}

#[test]
fn pct_change_is_relative_to_reference() {
    assert!((pct_change(107.0, 100.0) - 7.0).abs() < 1e-4);
    assert!((pct_change(93.0, 100.0) - 7.0).abs() < 1e-4);
    assert!((pct_change(-110.0, -100.0) - 10.0).abs() < 1e-4);
}

#[test]
fn pct_change_zero_reference() {
    assert_eq!(pct_change(0.0, 0.0), 0.0);
    assert!(pct_change(0.5, 0.0).is_infinite());
}
