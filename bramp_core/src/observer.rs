//! Observer port of the dispatch engine.
//!
//! Callbacks run on the timing thread, synchronously with the step they
//! describe, so implementations must return quickly. For a given step the
//! order is always `will_dispatch` -> trigger action -> `did_dispatch`,
//! and the next step's `will_dispatch` never starts before that.

use crossbeam_channel as xch;

use crate::error::CancelReason;
use crate::sequence::Step;

/// Receives playback lifecycle notifications. All methods default to no-ops.
pub trait DispatchObserver {
    /// About to act on `step`; nothing has touched the trigger yet.
    fn will_dispatch(&mut self, _index: usize, _step: &Step) {}
    /// `step` ran to its full duration.
    fn did_dispatch(&mut self, _index: usize, _step: &Step) {}
    fn sequence_completed(&mut self) {}
    /// Playback stopped early; no `did_dispatch` follows for the step that
    /// was in progress.
    fn sequence_cancelled(&mut self, _reason: &CancelReason) {}
}

impl<O: DispatchObserver + ?Sized> DispatchObserver for Box<O> {
    fn will_dispatch(&mut self, index: usize, step: &Step) {
        (**self).will_dispatch(index, step);
    }
    fn did_dispatch(&mut self, index: usize, step: &Step) {
        (**self).did_dispatch(index, step);
    }
    fn sequence_completed(&mut self) {
        (**self).sequence_completed();
    }
    fn sequence_cancelled(&mut self, reason: &CancelReason) {
        (**self).sequence_cancelled(reason);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DispatchObserver for NoopObserver {}

/// Message form of the observer callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    WillDispatch { index: usize, step: Step },
    DidDispatch { index: usize, step: Step },
    Completed,
    Cancelled(CancelReason),
}

impl DispatchEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::WillDispatch { .. } => "will_dispatch",
            Self::DidDispatch { .. } => "did_dispatch",
            Self::Completed => "completed",
            Self::Cancelled(_) => "cancelled",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled(_))
    }
}

/// Forwards every callback as a `DispatchEvent` to whoever holds the
/// receiving end. A dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: xch::Sender<DispatchEvent>,
}

impl ChannelObserver {
    pub fn new(tx: xch::Sender<DispatchEvent>) -> Self {
        Self { tx }
    }

    pub fn unbounded() -> (Self, xch::Receiver<DispatchEvent>) {
        let (tx, rx) = xch::unbounded();
        (Self { tx }, rx)
    }

    fn send(&self, event: DispatchEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("dispatch event receiver gone");
        }
    }
}

impl DispatchObserver for ChannelObserver {
    fn will_dispatch(&mut self, index: usize, step: &Step) {
        self.send(DispatchEvent::WillDispatch { index, step: *step });
    }
    fn did_dispatch(&mut self, index: usize, step: &Step) {
        self.send(DispatchEvent::DidDispatch { index, step: *step });
    }
    fn sequence_completed(&mut self) {
        self.send(DispatchEvent::Completed);
    }
    fn sequence_cancelled(&mut self, reason: &CancelReason) {
        self.send(DispatchEvent::Cancelled(reason.clone()));
    }
}

/// Calls each observer in insertion order.
#[derive(Default)]
pub struct Fanout {
    observers: Vec<Box<dyn DispatchObserver + Send>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, observer: impl DispatchObserver + Send + 'static) -> Self {
        self.push(observer);
        self
    }

    pub fn push(&mut self, observer: impl DispatchObserver + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for Fanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fanout")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl DispatchObserver for Fanout {
    fn will_dispatch(&mut self, index: usize, step: &Step) {
        for o in &mut self.observers {
            o.will_dispatch(index, step);
        }
    }
    fn did_dispatch(&mut self, index: usize, step: &Step) {
        for o in &mut self.observers {
            o.did_dispatch(index, step);
        }
    }
    fn sequence_completed(&mut self) {
        for o in &mut self.observers {
            o.sequence_completed();
        }
    }
    fn sequence_cancelled(&mut self, reason: &CancelReason) {
        for o in &mut self.observers {
            o.sequence_cancelled(reason);
        }
    }
}
