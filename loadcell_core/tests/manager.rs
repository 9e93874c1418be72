use loadcell_core::config::ManagerCfg;
use loadcell_core::manager::{ManagerOutput, ManagerState, SleepReason, WeightManager};
use loadcell_core::{Threshold, Thresholds};

fn manager() -> WeightManager {
    WeightManager::new(ManagerCfg::default())
}

fn wakes(out: Option<ManagerOutput>) -> bool {
    matches!(out, Some(ManagerOutput::Wake { .. }))
}

#[test]
fn wakes_on_the_nth_consecutive_reading() {
    let mut m = manager();
    assert_eq!(m.process(25.0, 0), None);
    assert_eq!(m.state(), ManagerState::DebounceAdd);
    assert_eq!(m.process(26.0, 10), None);
    assert_eq!(
        m.process(27.0, 20),
        Some(ManagerOutput::Wake { weight_g: 27.0 })
    );
    assert_eq!(m.state(), ManagerState::Measuring);
    assert_eq!(m.last_event_ms(), 20);
}

#[test]
fn interrupted_debounce_starts_over() {
    let mut m = manager();
    m.process(25.0, 0);
    m.process(25.0, 10);
    m.process(5.0, 20);
    assert_eq!(m.state(), ManagerState::NoWeight);
    assert!(!wakes(m.process(25.0, 30)));
    assert!(!wakes(m.process(25.0, 40)));
    assert!(wakes(m.process(25.0, 50)));
}

#[test]
fn sleeps_after_n_low_readings() {
    let mut m = manager();
    for t in 0..3 {
        m.process(50.0, t * 10);
    }
    assert_eq!(m.process(3.0, 100), None);
    assert_eq!(m.state(), ManagerState::DebounceRemove);
    // bounce back up cancels removal
    m.process(50.0, 110);
    assert_eq!(m.state(), ManagerState::Measuring);
    m.process(3.0, 120);
    m.process(3.0, 130);
    assert_eq!(
        m.process(2.0, 140),
        Some(ManagerOutput::Sleep {
            weight_g: 2.0,
            reason: SleepReason::BelowThreshold
        })
    );
    assert_eq!(m.state(), ManagerState::NoWeight);
}

#[test]
fn hysteresis_band_keeps_active() {
    let mut m = manager();
    for t in 0..3 {
        m.process(50.0, t * 10);
    }
    for t in 3..50 {
        m.process(15.0, t * 10);
        assert_eq!(m.state(), ManagerState::Measuring);
    }
}

#[test]
fn status_is_rate_limited() {
    let mut m = manager();
    for t in 0..3 {
        m.process(50.0, t);
    }
    let statuses = (3..1_003u64)
        .filter_map(|t| m.process(50.0, t))
        .filter(|o| matches!(o, ManagerOutput::Status { .. }))
        .count();
    // 1 ms readings, 100 ms interval
    assert!((9..=10).contains(&statuses), "statuses = {statuses}");
}

#[test]
fn steady_load_stays_active_past_the_timeout() {
    let mut m = manager();
    for t in 0..3 {
        m.process(50.0, t);
    }
    for t in (1..=15).map(|i| i * 10_000) {
        assert!(!matches!(m.process(50.0, t), Some(ManagerOutput::Sleep { .. })));
    }
    assert_eq!(m.state(), ManagerState::Measuring);
    assert_eq!(m.last_activity_ms(), 150_000);
}

#[test]
fn inactivity_timeout_sleeps_and_requires_clearing() {
    let mut m = manager();
    for t in 0..3 {
        m.process(50.0, t);
    }
    // readings in the hysteresis band keep it awake but are not activity
    m.process(15.0, 30_000);
    m.process(50.0, 40_000);
    assert!(!matches!(m.process(15.0, 99_000), Some(ManagerOutput::Sleep { .. })));
    assert_eq!(m.state(), ManagerState::Measuring);
    assert_eq!(
        m.process(15.0, 100_001),
        Some(ManagerOutput::Sleep {
            weight_g: 15.0,
            reason: SleepReason::Timeout
        })
    );
    // a heavier load does not wake it until the scale clears
    for t in 0..10 {
        assert!(!wakes(m.process(50.0, 100_010 + t)));
    }
    m.process(0.0, 101_000);
    m.process(50.0, 101_010);
    m.process(50.0, 101_020);
    assert!(wakes(m.process(50.0, 101_030)));
}

#[test]
fn insane_reading_enters_error_and_recovers() {
    let mut m = manager();
    m.process(25.0, 0);
    m.process(25.0, 10);
    assert_eq!(m.process(5_000.0, 20), None);
    assert_eq!(m.state(), ManagerState::Error);
    assert_eq!(m.process(f32::INFINITY, 30), None);
    assert_eq!(m.state(), ManagerState::Error);
    assert_eq!(m.process(3.0, 40), None);
    assert_eq!(m.state(), ManagerState::NoWeight);
    assert_eq!(m.debounce_count(), 0);
}

#[test]
fn debounce_of_one_wakes_immediately() {
    let mut m = WeightManager::new(ManagerCfg {
        debounce_count: 1,
        ..ManagerCfg::default()
    });
    assert!(wakes(m.process(30.0, 0)));
    assert!(matches!(
        m.process(1.0, 10),
        Some(ManagerOutput::Sleep { .. })
    ));
}

#[test]
fn rejected_wake_change_leaves_hysteresis_intact() {
    let th = Thresholds::default();
    assert!(th.set(Threshold::Wake, 5.0).is_err());

    let mut m = manager();
    let mut transitions = 0;
    for t in 0..60u64 {
        m.set_wake_threshold(th.get(Threshold::Wake));
        m.set_sleep_threshold(th.get(Threshold::Sleep));
        if matches!(
            m.process(8.0, t * 10),
            Some(ManagerOutput::Wake { .. } | ManagerOutput::Sleep { .. })
        ) {
            transitions += 1;
        }
    }
    assert_eq!(transitions, 0);
    assert_eq!(m.state(), ManagerState::NoWeight);
}
