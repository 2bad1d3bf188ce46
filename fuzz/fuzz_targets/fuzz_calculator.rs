#![no_main]
use bramp_core::{BrampingParams, RampCurve, TimeValue};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u16, u32, u32, u32, bool)| {
    let (photos, first, last, interval, exp) = input;
    let mut params = BrampingParams::new(
        u32::from(photos),
        TimeValue::from_millis(u64::from(first)),
        TimeValue::from_millis(u64::from(last)),
        TimeValue::from_millis(u64::from(interval)),
    );
    if exp {
        params.curve = RampCurve::Exponential;
    }
    if let Ok(seq) = params.sequence() {
        let n = usize::from(photos);
        assert_eq!(seq.len(), 2 * n - 1);
        let total = u64::from(interval) * (u64::from(photos) - 1) + seq.exposures().last().map_or(0, |e| e.as_millis());
        assert_eq!(seq.total_duration().as_millis(), total);
    }
});
