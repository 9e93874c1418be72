#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use loadcell_core::config::FilterCfg;
use loadcell_core::filter::{FilterMode, MedianParams};

#[derive(Debug, Arbitrary)]
struct Input {
    median: bool,
    ma_window: u8,
    max_samples: u8,
    readings: Vec<i32>,
}

fuzz_target!(|input: Input| {
    let max = usize::from(input.max_samples % 32);
    let cfg = FilterCfg {
        mode: if input.median && max > 0 {
            FilterMode::Median
        } else {
            FilterMode::Smoothing
        },
        ma_window: usize::from(input.ma_window % 64),
        median: MedianParams {
            min_samples: max.min(3).max(1),
            max_samples: max,
            ..MedianParams::default()
        },
        ..FilterCfg::default()
    };
    let mut pipeline = cfg.build();
    for raw in input.readings {
        // 24-bit ADC range
        let raw = raw.clamp(-(1 << 23), (1 << 23) - 1) as f32;
        let out = pipeline.process(raw);
        assert!(out.is_finite(), "non-finite output {out} for {raw}");
    }
});
