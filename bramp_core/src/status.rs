//! Playback state snapshots and outcomes reported by the dispatcher.

use crate::error::CancelReason;
use crate::time::TimeValue;

/// Point-in-time view of the dispatch engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    /// Working through step `cursor`, `elapsed_in_step` into it.
    Playing {
        cursor: usize,
        elapsed_in_step: TimeValue,
    },
    /// Cancel requested; the timing thread will stop at its next tick.
    Cancelling { cursor: usize },
}

impl PlaybackState {
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// How a playback ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Cancelled(CancelReason),
}

impl PlaybackOutcome {
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}
