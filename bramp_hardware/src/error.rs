use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("trigger disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, HwError>;
