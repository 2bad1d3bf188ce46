//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub const DEFAULT_CONFIG: &str = "etc/bramp_config.toml";

#[derive(Parser, Debug)]
#[command(name = "bramp", version, about = "Bulb-ramping timelapse sequencer")]
pub struct Cli {
    /// Path to config TOML; the default path may be absent
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Custom exposure ladder CSV (headers: label,ms)
    #[arg(long, value_name = "FILE")]
    pub presets: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CurveArg {
    Linear,
    Exponential,
}

impl From<CurveArg> for bramp_core::RampCurve {
    fn from(c: CurveArg) -> Self {
        match c {
            CurveArg::Linear => Self::Linear,
            CurveArg::Exponential => Self::Exponential,
        }
    }
}

/// Ramp parameters; each one falls back to `[sequence]` in the config.
#[derive(Args, Debug, Clone, Default)]
pub struct SequenceArgs {
    /// Number of photos to take
    #[arg(long, value_name = "N")]
    pub photos: Option<u32>,
    /// Time between shutter openings (e.g. 10s, 1m 30s, 2500ms)
    #[arg(long, value_name = "DURATION")]
    pub interval: Option<String>,
    /// First exposure (e.g. 1/4, 500ms, 2s)
    #[arg(long, value_name = "DURATION")]
    pub first: Option<String>,
    /// Last exposure
    #[arg(long, value_name = "DURATION")]
    pub last: Option<String>,
    /// How exposures move between first and last
    #[arg(long, value_enum)]
    pub curve: Option<CurveArg>,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute a ramp and print its summary without touching the trigger
    Plan {
        #[command(flatten)]
        seq: SequenceArgs,
        /// List every exposure
        #[arg(long, action = ArgAction::SetTrue)]
        steps: bool,
    },
    /// Compute a ramp and play it through the trigger (Ctrl-C cancels)
    Run {
        #[command(flatten)]
        seq: SequenceArgs,
        /// Enable real-time mode (SCHED_FIFO, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on Linux.\n\nApplies SCHED_FIFO to the process before the timing thread starts (new threads inherit it) and locks memory with mlockall. Needs CAP_SYS_NICE / CAP_IPC_LOCK or root; failures are logged and the run continues without them."
        )]
        rt: bool,
        /// Real-time priority for SCHED_FIFO (1..=max)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt: none, current, or all
        #[arg(long, value_enum, value_name = "MODE", default_value = "current")]
        rt_lock: RtLock,
    },
    /// Print the exposure ladder
    Presets {
        /// Only list exposures that fit inside this interval
        #[arg(long, value_name = "DURATION")]
        interval: Option<String>,
    },
    /// Validate config and trigger presence
    SelfCheck,
}
