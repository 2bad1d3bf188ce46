//! Runtime configuration for the dispatch engine.
//!
//! Separate from the TOML-deserialized sections in `bramp_config`; see
//! `conversions` for the mapping.

use std::time::Duration;

use crate::error::BrampError;

/// Timing-loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchCfg {
    /// Longest single sleep inside a step wait. Bounds how long a cancel
    /// takes to be noticed.
    pub poll_ms: u64,
}

impl DispatchCfg {
    pub const DEFAULT_POLL_MS: u64 = 10;
    pub const MAX_POLL_MS: u64 = 50;

    pub fn validate(&self) -> Result<(), BrampError> {
        if !(1..=Self::MAX_POLL_MS).contains(&self.poll_ms) {
            return Err(BrampError::InvalidParameters(format!(
                "poll interval must be within 1..={} ms (got {})",
                Self::MAX_POLL_MS,
                self.poll_ms
            )));
        }
        Ok(())
    }

    #[inline]
    pub const fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

impl Default for DispatchCfg {
    fn default() -> Self {
        Self {
            poll_ms: Self::DEFAULT_POLL_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(10, true)]
    #[case(50, true)]
    #[case(51, false)]
    fn poll_bounds(#[case] poll_ms: u64, #[case] ok: bool) {
        assert_eq!(DispatchCfg { poll_ms }.validate().is_ok(), ok);
    }
}
