//! Maps `Box<dyn Error>` from the `Trigger` boundary to typed errors.
//!
//! With feature `hardware-errors`, `bramp_hardware::HwError` is downcast for
//! precise messages; anything else falls back to its `Display` text.

use crate::error::{BrampError, CancelReason};

/// Map a trigger error to `BrampError::HardwareFault`.
pub fn map_trigger_error(e: &(dyn std::error::Error + 'static)) -> BrampError {
    #[cfg(feature = "hardware-errors")]
    {
        use bramp_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Disconnected => {
                    BrampError::HardwareFault("trigger disconnected".to_string())
                }
                other => BrampError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.is_empty() {
        BrampError::HardwareFault("unknown trigger error".to_string())
    } else {
        BrampError::HardwareFault(s)
    }
}

/// Cancel reason recorded when the trigger fails mid-sequence.
pub(crate) fn fault_reason(e: &(dyn std::error::Error + 'static)) -> CancelReason {
    match map_trigger_error(e) {
        BrampError::HardwareFault(msg) => CancelReason::HardwareFault(msg),
        other => CancelReason::HardwareFault(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_display_text() {
        let e = std::io::Error::other("line stuck high");
        assert_eq!(
            map_trigger_error(&e),
            BrampError::HardwareFault("line stuck high".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn downcasts_hw_error() {
        let e: Box<dyn std::error::Error + Send + Sync> =
            Box::new(bramp_hardware::error::HwError::Disconnected);
        assert_eq!(
            fault_reason(e.as_ref()),
            CancelReason::HardwareFault("trigger disconnected".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn gpio_error_keeps_its_detail() {
        let e = bramp_hardware::error::HwError::Gpio("pin 17 busy".into());
        assert_eq!(
            map_trigger_error(&e),
            BrampError::HardwareFault("gpio error: pin 17 busy".into())
        );
    }
}
