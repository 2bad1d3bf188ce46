#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core bulb-ramping logic (hardware-agnostic).
//!
//! All hardware interaction goes through `bramp_traits::Trigger`; time goes
//! through `bramp_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Calculation**: photo count, exposures and interval to a `Sequence`
//!   of alternating pulses and delays (`calculator` module)
//! - **Dispatch**: plays a `Sequence` on a timing thread, one playback per
//!   process (`dispatcher`, `builder`)
//! - **Observation**: per-step callbacks, channel fan-out and progress
//!   counters (`observer`, `progress`)
//! - **Presets and limits**: standard shutter ladder and interval floor
//!
//! ## Time
//!
//! Every duration is a whole number of milliseconds (`TimeValue`). Exposure
//! interpolation is exact integer arithmetic, so a given set of inputs
//! always yields the same sequence on every platform.

pub mod builder;
pub mod calculator;
pub mod config;
pub mod conversions;
pub mod dispatcher;
pub mod error;
pub mod hw_error;
pub mod limits;
pub mod mocks;
pub mod observer;
pub mod presets;
pub mod progress;
pub mod runner;
pub mod sequence;
pub mod status;
pub mod time;
pub mod util;

pub use builder::{DispatcherBuilder, Missing};
pub use calculator::{BrampingParams, RampCurve, compute_bramping_sequence};
pub use config::DispatchCfg;
pub use dispatcher::{CancelHandle, Dispatcher, PlaybackSlot};
pub use error::{BrampError, CancelReason};
pub use observer::{ChannelObserver, DispatchEvent, DispatchObserver, Fanout, NoopObserver};
pub use presets::{ExposureLadder, ExposurePreset};
pub use progress::{ProgressHandle, ProgressSnapshot, ProgressState, ProgressTracker};
pub use runner::run_to_completion;
pub use sequence::{Sequence, Step};
pub use status::{PlaybackOutcome, PlaybackState};
pub use time::{ParseTimeError, TimeValue};
