//! Camera trigger transports.
//!
//! `SimulatedTrigger` is always available and is what the CLI uses unless
//! built with the `hardware` feature, which adds a GPIO-driven trigger.

pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

use bramp_traits::Trigger;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::HwError;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::GpioTrigger;

/// Shared counters for a simulated trigger; cloneable so tests and the CLI
/// can inspect the line after the trigger itself moved into the timing thread.
#[derive(Debug, Default, Clone)]
pub struct TriggerStats {
    asserts: Arc<AtomicU64>,
    releases: Arc<AtomicU64>,
    asserted: Arc<AtomicBool>,
}

impl TriggerStats {
    pub fn asserts(&self) -> u64 {
        self.asserts.load(Ordering::Relaxed)
    }

    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }

    /// Whether the shutter line is currently held.
    pub fn is_asserted(&self) -> bool {
        self.asserted.load(Ordering::Relaxed)
    }
}

/// Trigger that only records line transitions.
#[derive(Debug, Default)]
pub struct SimulatedTrigger {
    stats: TriggerStats,
    // Fail the assert after this many successful ones (simulated unplug).
    fail_after: Option<u64>,
}

impl SimulatedTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the accessory disappearing: the `(n + 1)`-th assert fails.
    pub fn fail_after(mut self, n: u64) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn stats(&self) -> TriggerStats {
        self.stats.clone()
    }
}

impl Trigger for SimulatedTrigger {
    fn assert_trigger(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let done = self.stats.asserts();
        if self.fail_after.is_some_and(|n| done >= n) {
            tracing::warn!(asserts = done, "simulated trigger disconnected");
            return Err(Box::new(HwError::Disconnected));
        }
        self.stats.asserts.fetch_add(1, Ordering::Relaxed);
        self.stats.asserted.store(true, Ordering::Relaxed);
        tracing::trace!(n = done + 1, "trigger asserted (simulated)");
        Ok(())
    }

    fn release_trigger(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.stats.releases.fetch_add(1, Ordering::Relaxed);
        self.stats.asserted.store(false, Ordering::Relaxed);
        tracing::trace!("trigger released (simulated)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_trigger_tracks_line_level() {
        let mut trigger = SimulatedTrigger::new();
        let stats = trigger.stats();
        trigger.assert_trigger().unwrap();
        assert!(stats.is_asserted());
        trigger.release_trigger().unwrap();
        assert!(!stats.is_asserted());
        assert_eq!((stats.asserts(), stats.releases()), (1, 1));
    }
}
