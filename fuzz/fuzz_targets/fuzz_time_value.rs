#![no_main]
use bramp_core::TimeValue;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(t) = data.parse::<TimeValue>() {
        assert!(!t.to_string().is_empty());
        let _ = t.checked_add(t);
    }
});
