//! Input checks that depend on the trigger hardware rather than on the
//! ramp itself. The calculator never sees the pulse length.

use crate::calculator::BrampingParams;
use crate::error::BrampError;
use crate::time::TimeValue;

/// No interval below this is accepted, whatever the hardware.
pub const MIN_INTERVAL: TimeValue = TimeValue::from_millis(60);

/// Shortest usable interval for a trigger whose minimum reliable pulse is
/// `pulse_length`: every interval must fit at least one such pulse.
///
/// Each interval holds exactly one shot, so the photo count does not
/// raise the floor.
pub fn minimum_interval(pulse_length: TimeValue) -> TimeValue {
    MIN_INTERVAL.max(pulse_length)
}

/// Reject intervals the trigger cannot keep up with.
pub fn check_interval(params: &BrampingParams, pulse_length: TimeValue) -> Result<(), BrampError> {
    let min = minimum_interval(pulse_length);
    if params.interval < min {
        return Err(BrampError::InvalidParameters(format!(
            "interval ({}) is shorter than the minimum of {min} for this trigger",
            params.interval
        )));
    }
    Ok(())
}

/// Whether any exposure of the ramp is shorter than the pulse the camera
/// reliably registers; such frames may be dropped by the body.
pub fn has_short_exposures(params: &BrampingParams, pulse_length: TimeValue) -> bool {
    params.first_exposure.min(params.last_exposure) < pulse_length
}
