#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are fine; panics are not.
    if let Ok(cfg) = loadcell_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // a validated config must map and build without panicking
            let core = loadcell_core::CoreConfig::from(&cfg);
            let _ = core.filter.build();
        }
    }
});
