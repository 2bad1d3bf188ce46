use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrampError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("a sequence is already playing")]
    AlreadyPlaying,
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("sequence cancelled")]
    Cancelled,
    #[error("dispatcher unavailable: {0}")]
    Unavailable(&'static str),
}

/// Why a playback ended before its last step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// `cancel()` was called (user stop, Ctrl-C, shutter button pressed again).
    Requested,
    /// The trigger transport failed; playback stopped instead of retrying.
    HardwareFault(String),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => f.write_str("requested"),
            Self::HardwareFault(msg) => write!(f, "hardware fault: {msg}"),
        }
    }
}

impl From<CancelReason> for BrampError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Requested => Self::Cancelled,
            CancelReason::HardwareFault(msg) => Self::HardwareFault(msg),
        }
    }
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
