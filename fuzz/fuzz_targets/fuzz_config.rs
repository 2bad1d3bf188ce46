#![no_main]
use libfuzzer_sys::fuzz_target;

// Parse errors and validation errors are fine; panics are not.
fuzz_target!(|data: &str| {
    if let Ok(cfg) = bramp_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        let _ = bramp_core::BrampingParams::try_from(&cfg.sequence);
    }
});
