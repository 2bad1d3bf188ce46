use std::time::{Duration, Instant};

use bramp_core::mocks::{EventLog, Recorded, RecordingObserver, RecordingTrigger};
use bramp_core::{
    BrampError, CancelReason, ChannelObserver, DispatchEvent, Dispatcher, Fanout, PlaybackOutcome,
    PlaybackSlot, PlaybackState, ProgressState, ProgressTracker, Sequence, Step, TimeValue,
    compute_bramping_sequence,
};
use bramp_traits::{ManualClock, MonotonicClock};
use rstest::rstest;

use Recorded::{Assert, Cancelled, Completed, DidDispatch, Release, WillDispatch};

fn ms(v: u64) -> TimeValue {
    TimeValue::from_millis(v)
}

/// Spin until `cond` holds; the timing thread runs on its own schedule.
fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn three_photos() -> Sequence {
    compute_bramping_sequence(3, ms(100), ms(300), ms(1_000)).unwrap()
}

fn recording(
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

#[test]
fn callbacks_bracket_hardware_in_step_order() {
    let log = EventLog::new();
    let mut d = recording(RecordingTrigger::new(log.clone()), &log);
    d.play(three_photos()).unwrap();
    assert_eq!(d.wait(), Some(PlaybackOutcome::Completed));

    assert_eq!(
        log.snapshot(),
        vec![
            WillDispatch(0),
            Assert,
            Release,
            DidDispatch(0),
            WillDispatch(1),
            DidDispatch(1),
            WillDispatch(2),
            Assert,
            Release,
            DidDispatch(2),
            WillDispatch(3),
            DidDispatch(3),
            WillDispatch(4),
            Assert,
            Release,
            DidDispatch(4),
            Completed,
        ]
    );
    assert_eq!(d.current_state(), PlaybackState::Idle);
}

#[rstest]
// cancel while the second pulse is held: trigger released, no did_dispatch(2)
#[case(2, vec![WillDispatch(2), Assert, Release, Cancelled(CancelReason::Requested)])]
// cancel during a delay: no trigger call at all for that step
#[case(1, vec![WillDispatch(1), Cancelled(CancelReason::Requested)])]
fn cancel_mid_step_stops_without_did_dispatch(
    #[case] at: usize,
    #[case] tail: Vec<Recorded>,
) {
    let log = EventLog::new();
    let mut d = recording(RecordingTrigger::new(log.clone()), &log);
    let handle = d.cancel_handle();
    d.observer_mut().unwrap().cancel_on_step(at, handle);

    d.play(three_photos()).unwrap();
    assert_eq!(
        d.wait(),
        Some(PlaybackOutcome::Cancelled(CancelReason::Requested))
    );

    let events = log.snapshot();
    assert!(events.ends_with(&tail), "{events:?}");
    assert!(!events.contains(&DidDispatch(at)));
    assert_eq!(log.count(|e| *e == Assert), log.count(|e| *e == Release));
    assert!(!d.is_active());
}

#[test]
fn cancel_when_idle_is_a_noop() {
    let log = EventLog::new();
    let d = recording(RecordingTrigger::new(log.clone()), &log);
    d.cancel();
    assert!(!d.cancel_handle().cancel());
    assert_eq!(d.current_state(), PlaybackState::Idle);
    assert!(log.snapshot().is_empty());
}

#[test]
fn second_play_is_rejected_while_active() {
    let log = EventLog::new();
    let slot = PlaybackSlot::isolated();
    let mut d = Dispatcher::builder()
        .with_trigger(RecordingTrigger::new(log.clone()))
        .with_observer(RecordingObserver::new(log.clone()))
        .with_slot(slot.clone())
        .build()
        .unwrap();
    d.play(Sequence::from_steps(vec![Step::pulse(TimeValue::from_secs(30))]))
        .unwrap();

    assert_eq!(
        d.play(three_photos()).unwrap_err(),
        BrampError::AlreadyPlaying
    );
    assert!(matches!(
        d.current_state(),
        PlaybackState::Playing { cursor: 0, .. }
    ));

    // a second engine sharing the slot is blocked too
    let mut other = Dispatcher::builder()
        .with_trigger(RecordingTrigger::new(EventLog::new()))
        .with_observer(RecordingObserver::new(EventLog::new()))
        .with_slot(slot.clone())
        .build()
        .unwrap();
    assert_eq!(
        other.play(three_photos()).unwrap_err(),
        BrampError::AlreadyPlaying
    );

    assert_eq!(
        d.cancel_and_wait(),
        Some(PlaybackOutcome::Cancelled(CancelReason::Requested))
    );
    assert!(!slot.is_claimed());
    other.play(Sequence::from_steps(vec![Step::pulse(ms(0))])).unwrap();
    assert_eq!(other.wait(), Some(PlaybackOutcome::Completed));
}

#[test]
fn zero_length_pulse_asserts_and_releases() {
    let log = EventLog::new();
    let mut d = recording(RecordingTrigger::new(log.clone()), &log);
    d.play(Sequence::from_steps(vec![Step::pulse(ms(0))])).unwrap();
    assert_eq!(d.wait(), Some(PlaybackOutcome::Completed));
    assert_eq!(
        log.snapshot(),
        vec![WillDispatch(0), Assert, Release, DidDispatch(0), Completed]
    );
}

#[test]
fn empty_sequence_completes_immediately() {
    let log = EventLog::new();
    let mut d = recording(RecordingTrigger::new(log.clone()), &log);
    d.play(Sequence::default()).unwrap();
    assert_eq!(d.wait(), Some(PlaybackOutcome::Completed));
    assert_eq!(log.snapshot(), vec![Completed]);
}

#[test]
fn trigger_fault_cancels_and_engine_is_reusable() {
    let log = EventLog::new();
    let mut d = recording(RecordingTrigger::failing_on_assert(log.clone(), 2), &log);
    d.play(three_photos()).unwrap();

    let outcome = d.wait().unwrap();
    assert_eq!(
        outcome,
        PlaybackOutcome::Cancelled(CancelReason::HardwareFault(
            "simulated trigger fault".into()
        ))
    );
    let events = log.snapshot();
    assert_eq!(
        &events[events.len() - 3..],
        &[
            WillDispatch(2),
            Release,
            Cancelled(CancelReason::HardwareFault("simulated trigger fault".into())),
        ]
    );
    assert!(!events.contains(&DidDispatch(2)));
    assert_eq!(d.current_state(), PlaybackState::Idle);

    d.play(Sequence::from_steps(vec![Step::pulse(ms(50))])).unwrap();
    assert_eq!(d.wait(), Some(PlaybackOutcome::Completed));
}

#[test]
fn release_fault_cancels_without_did_dispatch() {
    let log = EventLog::new();
    // first pulse releases fine, the second one sticks
    let mut d = recording(RecordingTrigger::failing_on_release(log.clone(), 2), &log);
    d.play(three_photos()).unwrap();

    let fault = CancelReason::HardwareFault("release stuck".into());
    assert_eq!(d.wait(), Some(PlaybackOutcome::Cancelled(fault.clone())));

    let events = log.snapshot();
    assert!(
        events.ends_with(&[WillDispatch(2), Assert, Cancelled(fault)]),
        "{events:?}"
    );
    assert!(events.contains(&DidDispatch(0)));
    assert!(!events.contains(&DidDispatch(2)));
    assert!(!events.contains(&WillDispatch(3)));
    assert_eq!(d.current_state(), PlaybackState::Idle);
    assert!(!d.is_active());
}

#[test]
fn state_reports_cursor_and_time_into_step() {
    let log = EventLog::new();
    let mut d = Dispatcher::builder()
        .with_trigger(RecordingTrigger::new(log.clone()))
        .with_observer(RecordingObserver::new(log.clone()))
        .with_clock(MonotonicClock::new())
        .with_slot(PlaybackSlot::isolated())
        .build()
        .unwrap();
    d.play(Sequence::from_steps(vec![
        Step::pulse(ms(200)),
        Step::delay(TimeValue::from_secs(5)),
    ]))
    .unwrap();

    wait_for("delay step", || {
        matches!(d.current_state(), PlaybackState::Playing { cursor: 1, .. })
    });
    std::thread::sleep(Duration::from_millis(100));

    match d.current_state() {
        PlaybackState::Playing {
            cursor,
            elapsed_in_step,
        } => {
            assert_eq!(cursor, 1);
            // step start is the scheduled offset, so this counts from 200 ms
            let e = elapsed_in_step.as_millis();
            assert!((90..=250).contains(&e), "elapsed_in_step = {e} ms");
        }
        other => panic!("expected Playing, got {other:?}"),
    }
    assert_eq!(
        d.cancel_and_wait(),
        Some(PlaybackOutcome::Cancelled(CancelReason::Requested))
    );
}

#[test]
fn wait_without_play_is_none() {
    let log = EventLog::new();
    let mut d = recording(RecordingTrigger::new(log.clone()), &log);
    assert_eq!(d.wait(), None);
    assert!(d.trigger().is_some());
}

#[test]
fn channel_and_progress_observers_fan_out() {
    let (chan, rx) = ChannelObserver::unbounded();
    let seq = three_photos();
    let tracker = ProgressTracker::for_sequence(&seq);
    let progress = tracker.handle();

    let mut d = Dispatcher::builder()
        .with_trigger(RecordingTrigger::new(EventLog::new()))
        .with_observer(Fanout::new().with(chan).with(tracker))
        .with_clock(ManualClock::new())
        .with_slot(PlaybackSlot::isolated())
        .build()
        .unwrap();
    d.play(seq).unwrap();
    assert_eq!(d.wait(), Some(PlaybackOutcome::Completed));

    let events: Vec<DispatchEvent> = rx.try_iter().collect();
    assert_eq!(events.len(), 5 * 2 + 1);
    assert_eq!(
        events[2],
        DispatchEvent::WillDispatch {
            index: 1,
            step: Step::delay(ms(900))
        }
    );
    assert_eq!(events.last(), Some(&DispatchEvent::Completed));

    let snap = progress.snapshot();
    assert_eq!(snap.label(), "3/3");
    assert_eq!(snap.remaining, TimeValue::ZERO);
    assert_eq!(snap.state, ProgressState::Completed);
}

#[test]
fn dropping_a_playing_engine_cancels_and_frees_the_slot() {
    let slot = PlaybackSlot::isolated();
    let log = EventLog::new();
    let mut d = Dispatcher::builder()
        .with_trigger(RecordingTrigger::new(log.clone()))
        .with_observer(RecordingObserver::new(log.clone()))
        .with_clock(MonotonicClock::new())
        .with_slot(slot.clone())
        .build()
        .unwrap();
    d.play(Sequence::from_steps(vec![Step::pulse(TimeValue::from_secs(60))]))
        .unwrap();
    assert!(slot.is_claimed());
    wait_for("first assert", || log.count(|e| *e == Assert) == 1);

    let t0 = Instant::now();
    drop(d);
    assert!(t0.elapsed() < Duration::from_secs(2));
    assert!(!slot.is_claimed());
    assert_eq!(
        log.snapshot().last(),
        Some(&Cancelled(CancelReason::Requested))
    );
    assert_eq!(log.count(|e| *e == Release), 1);
}
