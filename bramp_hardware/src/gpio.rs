use rppal::gpio::{Gpio, OutputPin};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

/// Shutter release wired to a GPIO pin (usually through an optocoupler).
pub struct GpioTrigger {
    pin: OutputPin,
    active_low: bool,
}

impl GpioTrigger {
    pub fn new(pin: u8, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let out = gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("open trigger pin {pin}: {e}")))?
            .into_output();
        let mut trigger = Self {
            pin: out,
            active_low,
        };
        // Start released so a crashed previous run can't leave the shutter open.
        trigger.drive(false);
        debug!(pin, active_low, "gpio trigger ready");
        Ok(trigger)
    }

    fn drive(&mut self, asserted: bool) {
        if asserted != self.active_low {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        trace!(asserted, "gpio trigger level");
    }
}

impl bramp_traits::Trigger for GpioTrigger {
    fn assert_trigger(
        &mut self,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.drive(true);
        Ok(())
    }

    fn release_trigger(
        &mut self,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.drive(false);
        Ok(())
    }
}

impl Drop for GpioTrigger {
    fn drop(&mut self) {
        self.drive(false);
    }
}
