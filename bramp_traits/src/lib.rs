//! Hardware-facing seams shared by the sequencer crates.
//!
//! `bramp_core` drives a camera only through [`Trigger`] and measures time
//! only through [`Clock`], so both can be swapped for simulations in tests.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

#[cfg(any(test, feature = "testing"))]
pub use clock::manual::ManualClock;

/// The electrical contact that opens the camera shutter.
///
/// `assert_trigger` holds the shutter open (bulb mode) until
/// `release_trigger` is called. Implementations report transport faults
/// (cable pulled, GPIO unavailable, ...) as errors; callers do not retry.
pub trait Trigger {
    fn assert_trigger(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn release_trigger(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Trigger + ?Sized> Trigger for Box<T> {
    fn assert_trigger(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).assert_trigger()
    }

    fn release_trigger(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).release_trigger()
    }
}
