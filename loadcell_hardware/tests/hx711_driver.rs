use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use loadcell_hardware::error::HwError;
use loadcell_hardware::{Gain, Hx711, sign_extend_24};
use loadcell_traits::{ClockLine, DataLine, LoadCell};
use proptest::prelude::*;
use rstest::rstest;

/// Simulated HX711 pins: stays busy for `busy_polls` checks, then shifts out `word`.
#[derive(Default)]
struct Wire {
    busy_polls: u32,
    word: u32,
    clock_high: bool,
    rising_edges: u32,
}

struct FakeSck(Rc<RefCell<Wire>>);
struct FakeDt(Rc<RefCell<Wire>>);

impl ClockLine for FakeSck {
    fn set_high(&mut self) {
        let mut w = self.0.borrow_mut();
        w.clock_high = true;
        w.rising_edges += 1;
    }
    fn set_low(&mut self) {
        self.0.borrow_mut().clock_high = false;
    }
}

impl DataLine for FakeDt {
    fn is_high(&mut self) -> bool {
        let mut w = self.0.borrow_mut();
        if w.busy_polls > 0 {
            w.busy_polls -= 1;
            return true;
        }
        if !w.clock_high || w.rising_edges == 0 || w.rising_edges > 24 {
            return false;
        }
        let bit = 24 - w.rising_edges;
        (w.word >> bit) & 1 == 1
    }
}

fn driver(word: u32, busy_polls: u32) -> (Hx711<FakeSck, FakeDt>, Rc<RefCell<Wire>>) {
    let wire = Rc::new(RefCell::new(Wire {
        busy_polls,
        word,
        ..Wire::default()
    }));
    let hx = Hx711::new(FakeSck(wire.clone()), FakeDt(wire.clone()), Gain::A128)
        .with_polling(100, Duration::ZERO);
    (hx, wire)
}

#[rstest]
#[case(0x00_0000, 0)]
#[case(0x00_0001, 1)]
#[case(0x7F_FFFF, 8_388_607)]
#[case(0x80_0000, -8_388_608)]
#[case(0xFF_FFFF, -1)]
#[case(0xFF_FF38, -200)]
fn decodes_24_bit_words(#[case] word: u32, #[case] expected: i32) {
    let (mut hx, _) = driver(word, 0);
    assert_eq!(hx.read_raw(Gain::A128).ok(), Some(expected));
}

#[rstest]
#[case(Gain::A128, 25)]
#[case(Gain::B32, 26)]
#[case(Gain::A64, 27)]
fn trailing_pulses_select_gain(#[case] gain: Gain, #[case] edges: u32) {
    let (mut hx, wire) = driver(0x12_3456, 0);
    hx.read_raw(gain).expect("read");
    assert_eq!(wire.borrow().rising_edges, edges);
    assert!(!wire.borrow().clock_high, "clock must idle low");
    assert_eq!(hx.gain(), gain);
}

#[test]
fn waits_for_data_ready() {
    let (mut hx, _) = driver(0x00_0010, 7);
    assert_eq!(hx.read_raw(Gain::A128).ok(), Some(16));
}

#[test]
fn not_ready_is_bounded() {
    let (mut hx, wire) = driver(0x00_0010, u32::MAX);
    let err = hx.read_raw(Gain::A128).expect_err("must time out");
    assert!(matches!(err, HwError::DataReadyTimeout { polls: 100 }));
    assert_eq!(wire.borrow().rising_edges, 0, "no clocking before ready");
}

#[test]
fn load_cell_trait_reports_timeout() {
    let (hx, _) = driver(0, u32::MAX);
    let mut cell: Box<dyn LoadCell> = Box::new(hx);
    let err = cell.read_raw(Duration::from_millis(1)).expect_err("timeout");
    assert!(err.to_string().contains("timeout"));
}

proptest! {
    #[test]
    fn driver_matches_sign_extension(word in 0u32..0x0100_0000) {
        let (mut hx, _) = driver(word, 0);
        let raw = hx.read_raw(Gain::A128).expect("read");
        prop_assert_eq!(raw, sign_extend_24(word));
        prop_assert!((-(1 << 23)..(1 << 23)).contains(&raw));
    }
}
