//! Status LED
//!
//! The power LED doubles as button feedback: it is lit while at least
//! one button is held down.

use tracing::{debug, warn};

use fm_error::{FanmgrError, Result};

use crate::hw::gpio::{Direction, SysfsGpio};

/// Setter surface of the status LED driver
pub trait StatusLed {
    fn set_state(&mut self, on: bool) -> Result<()>;

    /// Blinking is driven by the kernel module; plain GPIO LEDs cannot blink
    fn set_blink_frequency(&mut self, hz: u8) -> Result<()> {
        Err(FanmgrError::NotSupported(format!("blink at {} Hz", hz)))
    }
}

/// LED wired to a sysfs GPIO output
#[derive(Debug)]
pub struct GpioLed {
    gpio: SysfsGpio,
    pin: u32,
    on: bool,
}

impl GpioLed {
    /// Export the pin as an output and switch the LED off
    pub fn open(gpio: SysfsGpio, pin: u32) -> Result<Self> {
        gpio.export(pin)?;
        let setup = gpio
            .set_direction(pin, Direction::Out)
            .and_then(|()| gpio.write(pin, false));
        if let Err(e) = setup {
            if let Err(unexport_err) = gpio.unexport(pin) {
                debug!(pin, error = %unexport_err, "unexport after failed LED setup");
            }
            return Err(e);
        }
        debug!(pin, "status LED ready");
        Ok(Self { gpio, pin, on: false })
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl StatusLed for GpioLed {
    fn set_state(&mut self, on: bool) -> Result<()> {
        self.gpio.write(self.pin, on)?;
        self.on = on;
        Ok(())
    }
}

impl Drop for GpioLed {
    fn drop(&mut self) {
        if let Err(e) = self.gpio.write(self.pin, false) {
            warn!(pin = self.pin, error = %e, "failed to switch status LED off");
        }
        if let Err(e) = self.gpio.unexport(self.pin) {
            warn!(pin = self.pin, error = %e, "failed to unexport status LED");
        }
    }
}

/// Lights the LED while any button is held
pub struct PressIndicator {
    led: Box<dyn StatusLed>,
    held: u32,
}

impl PressIndicator {
    pub fn new(led: Box<dyn StatusLed>) -> Self {
        Self { led, held: 0 }
    }

    pub fn held(&self) -> u32 {
        self.held
    }

    pub fn pressed(&mut self) {
        self.held += 1;
        if self.held == 1 {
            if let Err(e) = self.led.set_state(true) {
                warn!(error = %e, "failed to switch status LED on");
            }
        }
    }

    pub fn released(&mut self) {
        self.held = self.held.saturating_sub(1);
        if self.held == 0 {
            if let Err(e) = self.led.set_state(false) {
                warn!(error = %e, "failed to switch status LED off");
            }
        }
    }
}
