//! Type-state builder for `Dispatcher`.
//!
//! `build()` only exists once both a trigger and an observer have been
//! supplied; everything else has a default (monotonic clock, 10 ms poll,
//! process-wide playback slot).

use std::sync::Arc;
use std::time::Duration;

use bramp_traits::{Clock, MonotonicClock, Trigger};

use crate::config::DispatchCfg;
use crate::dispatcher::{Dispatcher, PlaybackSlot};
use crate::error::BrampError;
use crate::observer::DispatchObserver;

/// Placeholder for a port that has not been provided yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct Missing;

pub struct DispatcherBuilder<T, O> {
    trigger: T,
    observer: O,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    cfg: DispatchCfg,
    slot: Option<PlaybackSlot>,
}

impl DispatcherBuilder<Missing, Missing> {
    pub fn new() -> Self {
        Self {
            trigger: Missing,
            observer: Missing,
            clock: None,
            cfg: DispatchCfg::default(),
            slot: None,
        }
    }
}

impl Default for DispatcherBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, O> DispatcherBuilder<T, O> {
    pub fn with_trigger<T2: Trigger>(self, trigger: T2) -> DispatcherBuilder<T2, O> {
        DispatcherBuilder {
            trigger,
            observer: self.observer,
            clock: self.clock,
            cfg: self.cfg,
            slot: self.slot,
        }
    }

    pub fn with_observer<O2: DispatchObserver>(self, observer: O2) -> DispatcherBuilder<T, O2> {
        DispatcherBuilder {
            trigger: self.trigger,
            observer,
            clock: self.clock,
            cfg: self.cfg,
            slot: self.slot,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    #[must_use]
    pub fn with_config(mut self, cfg: &DispatchCfg) -> Self {
        self.cfg = *cfg;
        self
    }

    /// Rounded down to whole milliseconds.
    #[must_use]
    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.cfg.poll_ms = u64::try_from(poll.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_slot(mut self, slot: PlaybackSlot) -> Self {
        self.slot = Some(slot);
        self
    }
}

impl<T, O> DispatcherBuilder<T, O>
where
    T: Trigger + Send + 'static,
    O: DispatchObserver + Send + 'static,
{
    pub fn build(self) -> Result<Dispatcher<T, O>, BrampError> {
        self.cfg.validate()?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        Ok(Dispatcher::from_parts(
            self.trigger,
            self.observer,
            clock,
            self.cfg.poll(),
            self.slot.unwrap_or_else(PlaybackSlot::global),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{EventLog, RecordingTrigger};
    use crate::observer::NoopObserver;

    #[test]
    fn defaults_build() {
        let d = Dispatcher::builder()
            .with_trigger(RecordingTrigger::new(EventLog::new()))
            .with_observer(NoopObserver)
            .with_slot(PlaybackSlot::isolated())
            .build()
            .unwrap();
        assert_eq!(d.poll_interval(), Duration::from_millis(10));
        assert!(!d.is_active());
    }

    #[test]
    fn rejects_poll_outside_bounds() {
        let err = Dispatcher::builder()
            .with_trigger(RecordingTrigger::new(EventLog::new()))
            .with_observer(NoopObserver)
            .with_poll_interval(Duration::from_millis(51))
            .build()
            .unwrap_err();
        assert!(matches!(err, BrampError::InvalidParameters(_)));
    }
}
