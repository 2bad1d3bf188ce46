//! Blocking helpers that play a sequence to its end.
//!
//! The engine reports cancellation as an outcome; at this layer it becomes
//! an error so callers can map it to an exit status.

use std::sync::atomic::{AtomicBool, Ordering};

use bramp_traits::Trigger;

use crate::dispatcher::Dispatcher;
use crate::error::{BrampError, CancelReason, Report, Result as CoreResult};
use crate::observer::DispatchObserver;
use crate::sequence::Sequence;
use crate::status::PlaybackOutcome;

/// `Completed` is success; a requested cancel becomes `BrampError::Cancelled`
/// and a trigger fault `BrampError::HardwareFault`.
pub fn outcome_to_result(outcome: PlaybackOutcome) -> Result<(), BrampError> {
    match outcome {
        PlaybackOutcome::Completed => Ok(()),
        PlaybackOutcome::Cancelled(reason) => Err(reason.into()),
    }
}

/// Play `sequence` and block until it ends.
///
/// When `stop` is given it is polled once per dispatcher poll interval and
/// cancels the playback as soon as it reads `true` (e.g. set from a signal
/// handler).
pub fn run_to_completion<T, O>(
    dispatcher: &mut Dispatcher<T, O>,
    sequence: Sequence,
    stop: Option<&AtomicBool>,
) -> CoreResult<()>
where
    T: Trigger + Send + 'static,
    O: DispatchObserver + Send + 'static,
{
    dispatcher.play(sequence).map_err(Report::new)?;

    if let Some(stop) = stop {
        let poll = dispatcher.poll_interval();
        while dispatcher.is_active() {
            if stop.load(Ordering::Relaxed) {
                tracing::debug!("stop flag set; cancelling playback");
                dispatcher.cancel();
                break;
            }
            std::thread::sleep(poll);
        }
    }

    match dispatcher.wait() {
        Some(outcome) => {
            if let PlaybackOutcome::Cancelled(CancelReason::HardwareFault(msg)) = &outcome {
                tracing::error!(error = %msg, "run ended with trigger fault");
            }
            outcome_to_result(outcome).map_err(Report::new)
        }
        None => Err(Report::new(BrampError::Unavailable(
            "dispatch thread ended without an outcome",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::compute_bramping_sequence;
    use crate::dispatcher::PlaybackSlot;
    use crate::mocks::{EventLog, RecordingObserver, RecordingTrigger};
    use crate::time::TimeValue;
    use bramp_traits::ManualClock;

    fn dispatcher(
        trigger: RecordingTrigger,
        log: &EventLog,
    ) -> Dispatcher<RecordingTrigger, RecordingObserver> {
        Dispatcher::builder()
            .with_trigger(trigger)
            .with_observer(RecordingObserver::new(log.clone()))
            .with_clock(ManualClock::new())
            .with_slot(PlaybackSlot::isolated())
            .build()
            .unwrap()
    }

    fn seq() -> Sequence {
        let ms = TimeValue::from_millis;
        compute_bramping_sequence(4, ms(100), ms(400), ms(1_000)).unwrap()
    }

    #[test]
    fn completes_ok() {
        let log = EventLog::new();
        let mut d = dispatcher(RecordingTrigger::new(log.clone()), &log);
        run_to_completion(&mut d, seq(), None).unwrap();
        assert_eq!(log.count(|e| *e == crate::mocks::Recorded::Assert), 4);
    }

    #[test]
    fn preset_stop_flag_reports_cancelled() {
        let log = EventLog::new();
        let mut d = dispatcher(RecordingTrigger::new(log.clone()), &log);
        let stop = AtomicBool::new(true);
        // ManualClock finishes instantly, so either outcome is legal; a
        // cancel must surface as BrampError::Cancelled.
        if let Err(e) = run_to_completion(&mut d, seq(), Some(&stop)) {
            assert_eq!(e.downcast_ref::<BrampError>(), Some(&BrampError::Cancelled));
        }
    }

    #[test]
    fn stop_flag_set_mid_playback_cancels() {
        use crate::mocks::Recorded;
        use std::sync::Arc;
        use std::time::{Duration, Instant};

        let log = EventLog::new();
        let mut d = Dispatcher::builder()
            .with_trigger(RecordingTrigger::new(log.clone()))
            .with_observer(RecordingObserver::new(log.clone()))
            .with_clock(bramp_traits::MonotonicClock::new())
            .with_slot(PlaybackSlot::isolated())
            .build()
            .unwrap();
        let long = Sequence::from_steps(vec![crate::sequence::Step::pulse(TimeValue::from_secs(30))]);

        let stop = Arc::new(AtomicBool::new(false));
        let setter = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(100));
                stop.store(true, Ordering::Relaxed);
            })
        };
        let t0 = Instant::now();
        let err = run_to_completion(&mut d, long, Some(&*stop)).unwrap_err();
        setter.join().unwrap();

        assert_eq!(err.downcast_ref::<BrampError>(), Some(&BrampError::Cancelled));
        assert!(t0.elapsed() < Duration::from_secs(2));
        assert_eq!(
            log.count(|e| *e == Recorded::Assert),
            log.count(|e| *e == Recorded::Release)
        );
        assert!(!d.is_active());
    }

    #[test]
    fn trigger_fault_is_hardware_fault() {
        let log = EventLog::new();
        let mut d = dispatcher(RecordingTrigger::failing_on_assert(log.clone(), 2), &log);
        let err = run_to_completion(&mut d, seq(), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BrampError>(),
            Some(BrampError::HardwareFault(_))
        ));
    }
}
