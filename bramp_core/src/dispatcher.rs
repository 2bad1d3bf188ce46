//! Real-time playback of a `Sequence` through a `Trigger`.
//!
//! Each `play()` spawns one timing thread that owns the trigger and the
//! observer until the sequence ends, then hands them back through its join
//! handle. Step deadlines are absolute offsets from the sequence start, so
//! sleep overshoot never accumulates across steps. Waits are sliced into
//! poll intervals and check the cancel flag between slices.
//!
//! Only one sequence may play per process at a time: every dispatcher
//! claims a `PlaybackSlot` for the duration of a playback.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bramp_traits::{Clock, Trigger};

use crate::builder::{DispatcherBuilder, Missing};
use crate::error::{BrampError, CancelReason};
use crate::hw_error::fault_reason;
use crate::observer::DispatchObserver;
use crate::sequence::{Sequence, Step};
use crate::status::{PlaybackOutcome, PlaybackState};
use crate::time::TimeValue;

const IDLE: u8 = 0;
const PLAYING: u8 = 1;
const CANCELLING: u8 = 2;

/// State shared between the engine handle and its timing thread.
#[derive(Debug)]
pub(crate) struct Shared {
    status: AtomicU8,
    cursor: AtomicUsize,
    /// Scheduled start of the current step, in ms since the engine origin.
    step_started_ms: AtomicU64,
    cancel: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            status: AtomicU8::new(IDLE),
            cursor: AtomicUsize::new(0),
            step_started_ms: AtomicU64::new(0),
            cancel: AtomicBool::new(false),
        }
    }

    fn request_cancel(&self) -> bool {
        let moved = self
            .status
            .compare_exchange(PLAYING, CANCELLING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if moved {
            self.cancel.store(true, Ordering::Release);
        }
        moved
    }

    #[inline]
    fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.status.load(Ordering::Acquire) != IDLE
    }
}

/// Process-wide "a sequence is playing" flag.
///
/// `global()` is what production code uses; tests that run dispatchers in
/// parallel give each one an `isolated()` slot.
#[derive(Debug, Clone)]
pub struct PlaybackSlot(Arc<AtomicBool>);

impl PlaybackSlot {
    pub fn global() -> Self {
        static SLOT: OnceLock<Arc<AtomicBool>> = OnceLock::new();
        Self(Arc::clone(SLOT.get_or_init(|| Arc::new(AtomicBool::new(false)))))
    }

    pub fn isolated() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn is_claimed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn try_claim(&self, shared: &Arc<Shared>) -> Option<PlaybackGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PlaybackGuard {
                slot: Arc::clone(&self.0),
                shared: Arc::clone(shared),
            })
    }
}

impl Default for PlaybackSlot {
    fn default() -> Self {
        Self::global()
    }
}

/// Held for the lifetime of one playback. Dropping it (normal end, cancel,
/// or unwinding) returns the engine to Idle and frees the slot.
#[derive(Debug)]
struct PlaybackGuard {
    slot: Arc<AtomicBool>,
    shared: Arc<Shared>,
}

impl Drop for PlaybackGuard {
    fn drop(&mut self) {
        self.shared.status.store(IDLE, Ordering::Release);
        self.slot.store(false, Ordering::Release);
    }
}

/// Cloneable, thread-safe way to cancel a playback (signal handlers,
/// observers, UI threads).
#[derive(Debug, Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    /// No-op when idle. Returns whether this call moved the engine to
    /// Cancelling.
    pub fn cancel(&self) -> bool {
        self.shared.request_cancel()
    }

    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }
}

struct Finished<T, O> {
    trigger: T,
    observer: O,
    outcome: PlaybackOutcome,
}

/// Timing context handed to the playback thread.
struct Timing {
    shared: Arc<Shared>,
    clock: Arc<dyn Clock + Send + Sync>,
    origin: Instant,
    poll: Duration,
}

impl Timing {
    /// Sleep until `deadline` in slices of at most `poll`. Returns `false`
    /// when cancelled first.
    fn wait_until(&self, deadline: Instant) -> bool {
        loop {
            if self.shared.cancel_requested() {
                return false;
            }
            let remaining = self.clock.remaining_until(deadline);
            if remaining.is_zero() {
                return true;
            }
            self.clock.sleep(remaining.min(self.poll));
        }
    }
}

/// The dispatch engine.
pub struct Dispatcher<T, O> {
    ports: Option<(T, O)>,
    handle: Option<JoinHandle<Finished<T, O>>>,
    shared: Arc<Shared>,
    clock: Arc<dyn Clock + Send + Sync>,
    origin: Instant,
    poll: Duration,
    slot: PlaybackSlot,
}

impl<T, O> std::fmt::Debug for Dispatcher<T, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("status", &self.shared.status.load(Ordering::Relaxed))
            .field("poll", &self.poll)
            .field("has_ports", &self.ports.is_some())
            .finish_non_exhaustive()
    }
}

impl Dispatcher<Missing, Missing> {
    pub fn builder() -> DispatcherBuilder<Missing, Missing> {
        DispatcherBuilder::new()
    }
}

impl<T, O> Dispatcher<T, O>
where
    T: Trigger + Send + 'static,
    O: DispatchObserver + Send + 'static,
{
    pub(crate) fn from_parts(
        trigger: T,
        observer: O,
        clock: Arc<dyn Clock + Send + Sync>,
        poll: Duration,
        slot: PlaybackSlot,
    ) -> Self {
        let origin = clock.now();
        Self {
            ports: Some((trigger, observer)),
            handle: None,
            shared: Arc::new(Shared::new()),
            clock,
            origin,
            poll,
            slot,
        }
    }

    /// Start playing `sequence` on a new timing thread.
    ///
    /// Fails with `AlreadyPlaying` while this or any other dispatcher
    /// sharing the slot is active; the running playback is left untouched.
    pub fn play(&mut self, sequence: Sequence) -> Result<(), BrampError> {
        if self.shared.is_active() {
            return Err(BrampError::AlreadyPlaying);
        }
        let guard = self
            .slot
            .try_claim(&self.shared)
            .ok_or(BrampError::AlreadyPlaying)?;
        self.reap();
        let Some((trigger, observer)) = self.ports.take() else {
            drop(guard);
            return Err(BrampError::Unavailable(
                "trigger lost after a failed playback",
            ));
        };

        let shared = &self.shared;
        shared.cancel.store(false, Ordering::Release);
        shared.cursor.store(0, Ordering::Relaxed);
        shared
            .step_started_ms
            .store(self.clock.ms_since(self.origin), Ordering::Relaxed);
        shared.status.store(PLAYING, Ordering::Release);

        tracing::info!(
            steps = sequence.len(),
            shots = sequence.pulse_count(),
            total_ms = sequence.total_duration().as_millis(),
            "playback started"
        );

        let timing = Timing {
            shared: Arc::clone(&self.shared),
            clock: Arc::clone(&self.clock),
            origin: self.origin,
            poll: self.poll,
        };
        let spawned = std::thread::Builder::new()
            .name("bramp-dispatch".into())
            .spawn(move || playback_thread(trigger, observer, &sequence, &timing, guard));
        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn dispatch thread");
                Err(BrampError::Unavailable("failed to spawn dispatch thread"))
            }
        }
    }

    /// Join a thread that already finished so the ports are back in place.
    fn reap(&mut self) {
        if self.handle.is_some() {
            let _ = self.wait();
        }
    }
}

impl<T, O> Dispatcher<T, O> {
    /// Request cancellation. No-op when idle.
    pub fn cancel(&self) {
        if self.shared.request_cancel() {
            tracing::debug!("cancel requested");
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    pub fn current_state(&self) -> PlaybackState {
        let s = &self.shared;
        match s.status.load(Ordering::Acquire) {
            PLAYING => {
                let started = s.step_started_ms.load(Ordering::Relaxed);
                let now = self.clock.ms_since(self.origin);
                PlaybackState::Playing {
                    cursor: s.cursor.load(Ordering::Relaxed),
                    elapsed_in_step: TimeValue::from_millis(now.saturating_sub(started)),
                }
            }
            CANCELLING => PlaybackState::Cancelling {
                cursor: s.cursor.load(Ordering::Relaxed),
            },
            _ => PlaybackState::Idle,
        }
    }

    /// Block until the current playback ends. `None` if nothing was
    /// playing (or the outcome was already collected).
    pub fn wait(&mut self) -> Option<PlaybackOutcome> {
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(Finished {
                trigger,
                observer,
                outcome,
            }) => {
                self.ports = Some((trigger, observer));
                Some(outcome)
            }
            Err(_) => {
                tracing::error!("dispatch thread panicked; trigger and observer are lost");
                None
            }
        }
    }

    pub fn cancel_and_wait(&mut self) -> Option<PlaybackOutcome> {
        self.cancel();
        self.wait()
    }

    /// The observer, when no playback holds it.
    pub fn observer(&self) -> Option<&O> {
        self.ports.as_ref().map(|(_, o)| o)
    }

    pub fn observer_mut(&mut self) -> Option<&mut O> {
        self.ports.as_mut().map(|(_, o)| o)
    }

    /// The trigger, when no playback holds it.
    pub fn trigger(&self) -> Option<&T> {
        self.ports.as_ref().map(|(t, _)| t)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll
    }

    /// Wait for any playback, then give back trigger and observer.
    pub fn into_parts(mut self) -> Option<(T, O)> {
        let _ = self.wait();
        self.ports.take()
    }
}

impl<T, O> Drop for Dispatcher<T, O> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.shared.request_cancel();
            if handle.join().is_err() {
                tracing::warn!("dispatch thread panicked during shutdown");
            }
        }
    }
}

fn playback_thread<T: Trigger, O: DispatchObserver>(
    mut trigger: T,
    mut observer: O,
    sequence: &Sequence,
    timing: &Timing,
    guard: PlaybackGuard,
) -> Finished<T, O> {
    let outcome = run_steps(&mut trigger, &mut observer, sequence, timing);
    // Idle before the terminal callback so a caller reacting to it can
    // start the next sequence straight away.
    drop(guard);
    match &outcome {
        PlaybackOutcome::Completed => {
            tracing::info!(steps = sequence.len(), "playback completed");
            observer.sequence_completed();
        }
        PlaybackOutcome::Cancelled(reason @ CancelReason::Requested) => {
            tracing::warn!("playback cancelled");
            observer.sequence_cancelled(reason);
        }
        PlaybackOutcome::Cancelled(reason @ CancelReason::HardwareFault(msg)) => {
            tracing::error!(error = %msg, "playback stopped by trigger fault");
            observer.sequence_cancelled(reason);
        }
    }
    Finished {
        trigger,
        observer,
        outcome,
    }
}

fn run_steps<T: Trigger, O: DispatchObserver>(
    trigger: &mut T,
    observer: &mut O,
    sequence: &Sequence,
    timing: &Timing,
) -> PlaybackOutcome {
    let shared = &timing.shared;
    let start = timing.clock.now();
    let base_ms = timing.clock.ms_since(timing.origin);
    let mut deadline = start;
    let mut offset_ms = 0u64;

    for (index, step) in sequence.iter().enumerate() {
        if shared.cancel_requested() {
            return PlaybackOutcome::Cancelled(CancelReason::Requested);
        }
        shared.cursor.store(index, Ordering::Relaxed);
        shared
            .step_started_ms
            .store(base_ms.saturating_add(offset_ms), Ordering::Relaxed);

        let duration = step.duration();
        offset_ms = offset_ms.saturating_add(duration.as_millis());
        deadline = deadline
            .checked_add(duration.as_duration())
            .unwrap_or(deadline);

        observer.will_dispatch(index, step);
        tracing::debug!(index, kind = step.kind(), duration_ms = duration.as_millis(), "step");

        match step {
            Step::Pulse { .. } => {
                if let Err(e) = trigger.assert_trigger() {
                    let reason = fault_reason(&*e);
                    if let Err(release_err) = trigger.release_trigger() {
                        tracing::warn!(error = %release_err, "release after failed assert also failed");
                    }
                    return PlaybackOutcome::Cancelled(reason);
                }
                let completed = timing.wait_until(deadline);
                let released = trigger.release_trigger();
                if !completed {
                    if let Err(e) = released {
                        tracing::warn!(error = %e, "release on cancel failed");
                    }
                    return PlaybackOutcome::Cancelled(CancelReason::Requested);
                }
                if let Err(e) = released {
                    return PlaybackOutcome::Cancelled(fault_reason(&*e));
                }
            }
            Step::Delay { .. } => {
                if !timing.wait_until(deadline) {
                    return PlaybackOutcome::Cancelled(CancelReason::Requested);
                }
            }
        }

        observer.did_dispatch(index, step);
    }
    PlaybackOutcome::Completed
}
