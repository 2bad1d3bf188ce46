//! Recording trigger and observer for exercising the dispatcher.
//!
//! Both write into one shared `EventLog`, so tests can check the exact
//! interleaving of observer callbacks and trigger calls.

use std::sync::{Arc, Mutex, PoisonError};

use crate::dispatcher::CancelHandle;
use crate::error::CancelReason;
use crate::observer::DispatchObserver;
use crate::sequence::Step;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    WillDispatch(usize),
    Assert,
    Release,
    DidDispatch(usize),
    Completed,
    Cancelled(CancelReason),
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Recorded>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Recorded) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn snapshot(&self) -> Vec<Recorded> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn count(&self, pred: impl Fn(&Recorded) -> bool) -> usize {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| pred(e))
            .count()
    }
}

/// Trigger that logs every call and can be told to fail its nth assert or
/// its nth release. A failed call is not logged.
#[derive(Debug)]
pub struct RecordingTrigger {
    log: EventLog,
    fail_on_assert: Option<usize>,
    fail_on_release: Option<usize>,
    asserts: usize,
    releases: usize,
}

impl RecordingTrigger {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            fail_on_assert: None,
            fail_on_release: None,
            asserts: 0,
            releases: 0,
        }
    }

    /// The `n`th assert (1-based) returns an error instead of asserting.
    pub fn failing_on_assert(log: EventLog, n: usize) -> Self {
        Self {
            fail_on_assert: Some(n),
            ..Self::new(log)
        }
    }

    /// The `n`th release (1-based) returns an error and leaves the line held.
    pub fn failing_on_release(log: EventLog, n: usize) -> Self {
        Self {
            fail_on_release: Some(n),
            ..Self::new(log)
        }
    }
}

impl bramp_traits::Trigger for RecordingTrigger {
    fn assert_trigger(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.asserts += 1;
        if self.fail_on_assert == Some(self.asserts) {
            return Err(Box::new(std::io::Error::other("simulated trigger fault")));
        }
        self.log.push(Recorded::Assert);
        Ok(())
    }

    fn release_trigger(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.releases += 1;
        if self.fail_on_release == Some(self.releases) {
            return Err(Box::new(std::io::Error::other("release stuck")));
        }
        self.log.push(Recorded::Release);
        Ok(())
    }
}

/// Observer that logs every callback. Optionally cancels the playback from
/// inside `will_dispatch` of a chosen step.
#[derive(Debug)]
pub struct RecordingObserver {
    log: EventLog,
    cancel_at: Option<(usize, CancelHandle)>,
}

impl RecordingObserver {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            cancel_at: None,
        }
    }

    pub fn cancel_on_step(&mut self, index: usize, handle: CancelHandle) {
        self.cancel_at = Some((index, handle));
    }
}

impl DispatchObserver for RecordingObserver {
    fn will_dispatch(&mut self, index: usize, _step: &Step) {
        self.log.push(Recorded::WillDispatch(index));
        if let Some((at, handle)) = &self.cancel_at {
            if *at == index {
                handle.cancel();
            }
        }
    }

    fn did_dispatch(&mut self, index: usize, _step: &Step) {
        self.log.push(Recorded::DidDispatch(index));
    }

    fn sequence_completed(&mut self) {
        self.log.push(Recorded::Completed);
    }

    fn sequence_cancelled(&mut self, reason: &CancelReason) {
        self.log.push(Recorded::Cancelled(reason.clone()));
    }
}
