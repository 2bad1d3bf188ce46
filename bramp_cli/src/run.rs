//! The `run` command: trigger assembly, playback, and progress output.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use bramp_config::Config;
use bramp_core::error::Report;
use bramp_core::{
    BrampError, CancelReason, DispatchCfg, DispatchObserver, Dispatcher, Fanout,
    ProgressHandle, ProgressTracker, Step, run_to_completion,
};
use bramp_traits::Trigger;
use eyre::{Result, WrapErr};
use serde_json::json;

use crate::cli::{RtLock, SequenceArgs};
use crate::plan::{print_plan, resolve_params};

/// Set by tests to make the simulated trigger fail after N shots.
#[cfg_attr(all(feature = "hardware", target_os = "linux"), allow(dead_code))]
const SIM_FAULT_ENV: &str = "BRAMP_TEST_SIM_FAULT_AFTER";

pub type BoxedTrigger = Box<dyn Trigger + Send>;

/// Build the configured trigger: GPIO with the `hardware` feature on Linux,
/// otherwise a simulation.
pub fn make_trigger(cfg: &Config) -> Result<BoxedTrigger> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let pin = cfg
            .hardware
            .trigger_pin
            .ok_or_else(|| eyre::eyre!("hardware.trigger_pin missing from config"))?;
        let trigger = bramp_hardware::GpioTrigger::new(pin, cfg.hardware.active_low)
            .wrap_err("open trigger pin")?;
        Ok(Box::new(trigger))
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let _ = cfg;
        let mut sim = bramp_hardware::SimulatedTrigger::new();
        if let Ok(v) = std::env::var(SIM_FAULT_ENV) {
            let n: u64 = v
                .parse()
                .wrap_err_with(|| format!("{SIM_FAULT_ENV} must be a number, got {v:?}"))?;
            sim = sim.fail_after(n);
        }
        Ok(Box::new(sim))
    }
}

/// Prints one line per finished shot: text or JSON lines.
struct ShotPrinter {
    json: bool,
    progress: ProgressHandle,
}

impl DispatchObserver for ShotPrinter {
    fn did_dispatch(&mut self, index: usize, step: &Step) {
        if !step.is_pulse() {
            return;
        }
        let snap = self.progress.snapshot();
        if self.json {
            println!(
                "{}",
                json!({
                    "event": "shot",
                    "index": index / 2,
                    "exposure_ms": step.duration().as_millis(),
                    "shots_taken": snap.shots_taken,
                    "total_shots": snap.total_shots,
                    "remaining_ms": snap.remaining.as_millis(),
                })
            );
        } else {
            println!("Shot {}  {}  ({} left)", snap.label(), step.duration(), snap.remaining);
        }
    }
}

pub fn run_sequence(
    args: &SequenceArgs,
    cfg: &Config,
    json_mode: bool,
    trigger: BoxedTrigger,
    rt: (bool, Option<i32>, RtLock),
) -> Result<()> {
    let params = resolve_params(args, cfg)?;
    let seq = params.sequence().map_err(Report::new)?;
    if !json_mode {
        print_plan(&params, &seq, false, false);
    }

    let (rt_on, rt_prio, rt_lock) = rt;
    #[cfg(target_os = "linux")]
    crate::rt::setup_rt_once(rt_on, rt_prio, rt_lock);
    #[cfg(not(target_os = "linux"))]
    if rt_on {
        let _ = (rt_prio, rt_lock);
        tracing::warn!("--rt is only supported on Linux; ignoring");
    }

    // Tracker updates before the printer reads it.
    let tracker = ProgressTracker::for_sequence(&seq);
    let progress = tracker.handle();
    let observer = Fanout::new().with(tracker).with(ShotPrinter {
        json: json_mode,
        progress: progress.clone(),
    });

    let mut dispatcher = Dispatcher::builder()
        .with_trigger(trigger)
        .with_observer(observer)
        .with_config(&DispatchCfg::from(&cfg.dispatch))
        .build()
        .map_err(Report::new)?;

    // Ctrl-C only flips the flag; the runner cancels on its next poll.
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        if !flag.swap(true, Ordering::Relaxed) {
            eprintln!("Cancelling...");
        }
    }) {
        tracing::warn!(error = %e, "Ctrl-C handler not installed");
    }

    let started = Instant::now();
    let result = run_to_completion(&mut dispatcher, seq, Some(&*shutdown));
    let snap = progress.snapshot();
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match &result {
        Ok(()) => {
            if json_mode {
                println!(
                    "{}",
                    json!({
                        "event": "completed",
                        "shots_taken": snap.shots_taken,
                        "total_shots": snap.total_shots,
                        "elapsed_ms": elapsed_ms,
                    })
                );
            } else {
                println!("Sequence complete: {} shots", snap.label());
            }
        }
        Err(e) => {
            if json_mode
                && let Some(be) = e.downcast_ref::<BrampError>()
            {
                let reason = match be {
                    BrampError::Cancelled => CancelReason::Requested.to_string(),
                    other => other.to_string(),
                };
                println!(
                    "{}",
                    json!({
                        "event": "cancelled",
                        "reason": reason,
                        "shots_taken": snap.shots_taken,
                        "total_shots": snap.total_shots,
                        "elapsed_ms": elapsed_ms,
                    })
                );
            }
        }
    }
    result.wrap_err_with(|| format!("sequence stopped after {} shots", snap.label()))
}
