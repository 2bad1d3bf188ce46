//! Shot counting and remaining-time tracking for a playing sequence.
//!
//! `ProgressTracker` is a `DispatchObserver`; it moves into the timing
//! thread with the dispatcher while any number of `ProgressHandle`s read
//! the counters from other threads.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};

use crate::error::CancelReason;
use crate::observer::DispatchObserver;
use crate::sequence::{Sequence, Step};
use crate::time::TimeValue;

const RUNNING: u8 = 0;
const COMPLETED: u8 = 1;
const CANCELLED: u8 = 2;

#[derive(Debug)]
struct Counters {
    total_shots: u32,
    total_ms: u64,
    shots_taken: AtomicU32,
    done_ms: AtomicU64,
    finish: AtomicU8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    Running,
    Completed,
    Cancelled,
}

/// Consistent-enough view of the counters at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub shots_taken: u32,
    pub total_shots: u32,
    /// Scheduled time of the steps that have not finished yet.
    pub remaining: TimeValue,
    pub state: ProgressState,
}

impl ProgressSnapshot {
    pub const fn is_finished(&self) -> bool {
        !matches!(self.state, ProgressState::Running)
    }

    /// "3/10"
    pub fn label(&self) -> String {
        format!("{}/{}", self.shots_taken, self.total_shots)
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} shots, {} remaining", self.label(), self.remaining)
    }
}

#[derive(Debug)]
pub struct ProgressTracker {
    counters: Arc<Counters>,
}

impl ProgressTracker {
    pub fn for_sequence(sequence: &Sequence) -> Self {
        let total_shots = u32::try_from(sequence.pulse_count()).unwrap_or(u32::MAX);
        Self {
            counters: Arc::new(Counters {
                total_shots,
                total_ms: sequence.total_duration().as_millis(),
                shots_taken: AtomicU32::new(0),
                done_ms: AtomicU64::new(0),
                finish: AtomicU8::new(RUNNING),
            }),
        }
    }

    pub fn handle(&self) -> ProgressHandle {
        ProgressHandle {
            counters: Arc::clone(&self.counters),
        }
    }
}

impl DispatchObserver for ProgressTracker {
    fn did_dispatch(&mut self, _index: usize, step: &Step) {
        let c = &self.counters;
        if step.is_pulse() {
            c.shots_taken.fetch_add(1, Ordering::Relaxed);
        }
        c.done_ms
            .fetch_add(step.duration().as_millis(), Ordering::Relaxed);
    }

    fn sequence_completed(&mut self) {
        self.counters.finish.store(COMPLETED, Ordering::Release);
    }

    fn sequence_cancelled(&mut self, _reason: &CancelReason) {
        self.counters.finish.store(CANCELLED, Ordering::Release);
    }
}

/// Read side of a `ProgressTracker`.
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    counters: Arc<Counters>,
}

impl ProgressHandle {
    pub fn snapshot(&self) -> ProgressSnapshot {
        let c = &self.counters;
        let state = match c.finish.load(Ordering::Acquire) {
            COMPLETED => ProgressState::Completed,
            CANCELLED => ProgressState::Cancelled,
            _ => ProgressState::Running,
        };
        let done = c.done_ms.load(Ordering::Relaxed);
        ProgressSnapshot {
            shots_taken: c.shots_taken.load(Ordering::Relaxed),
            total_shots: c.total_shots,
            remaining: TimeValue::from_millis(c.total_ms.saturating_sub(done)),
            state,
        }
    }
}
