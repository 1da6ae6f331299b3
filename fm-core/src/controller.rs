//! Mode/frequency controller
//!
//! Single owner of the policy deciding which mode and frequency values
//! reach the attribute store. Two entry points feed it:
//! - IPC commands through [`Controller::apply`], where an out-of-range
//!   frequency is rejected and manual mode is required;
//! - front-panel buttons through [`ButtonObserver`], where increments
//!   saturate at the bounds instead of failing.
//!
//! Every successful mutation is followed by a display refresh.

use tracing::{debug, error, info, warn};

use fm_error::{FanmgrError, Result};
use fm_protocol::{clamp_frequency, validate_frequency, Command, Mode};

use crate::attributes::{Attribute, AttributeStore, AttributeStoreExt};
use crate::display::Display;
use crate::hw::{Button, ButtonId, ButtonObserver};
use crate::led::{PressIndicator, StatusLed};

/// State change produced by a successful command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Frequency(u8),
    Mode(Mode),
}

pub struct Controller<S: AttributeStore> {
    store: S,
    display: Box<dyn Display>,
    indicator: Option<PressIndicator>,
}

impl<S: AttributeStore> Controller<S> {
    pub fn new(store: S, display: Box<dyn Display>) -> Self {
        Self {
            store,
            display,
            indicator: None,
        }
    }

    /// Light `led` while any button is held
    pub fn with_status_led(mut self, led: Box<dyn StatusLed>) -> Self {
        self.indicator = Some(PressIndicator::new(led));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply an IPC command.
    ///
    /// Rejections (`AutoModeActive`, `InvalidFrequency`, `UnknownCommand`)
    /// leave the store untouched.
    pub fn apply(&mut self, command: Command) -> Result<Applied> {
        match command {
            Command::SetFrequency(value) => {
                // mode first, so auto mode wins over a bad value
                if self.store.read_mode()? == Mode::Auto {
                    return Err(FanmgrError::AutoModeActive);
                }
                let hz = validate_frequency(value)?;
                self.store.write_frequency(hz)?;
                info!(frequency = hz, "frequency set");
                self.refresh_display();
                Ok(Applied::Frequency(hz))
            }
            Command::SetMode(mode) => {
                self.store.write_mode(mode)?;
                info!(mode = %mode, "mode set");
                self.refresh_display();
                Ok(Applied::Mode(mode))
            }
            Command::Unknown(raw) => Err(FanmgrError::UnknownCommand(raw)),
        }
    }

    /// Flip between auto and manual. An unreadable stored mode counts as
    /// manual, so the result is auto.
    pub fn toggle_mode(&mut self) -> Result<Mode> {
        let next = match self.store.read_mode() {
            Ok(mode) => mode.toggled(),
            Err(FanmgrError::InvalidAttributeValue { value, .. }) => {
                warn!(value = %value, "unrecognized stored mode, switching to auto");
                Mode::Auto
            }
            Err(e) => return Err(e),
        };
        self.store.write_mode(next)?;
        info!(mode = %next, "mode toggled");
        self.refresh_display();
        Ok(next)
    }

    pub fn increment_frequency(&mut self) -> Result<u8> {
        self.step_frequency(1)
    }

    pub fn decrement_frequency(&mut self) -> Result<u8> {
        self.step_frequency(-1)
    }

    fn step_frequency(&mut self, delta: i64) -> Result<u8> {
        let current = self.store.read_frequency()?;
        let hz = clamp_frequency(current.saturating_add(delta));
        self.store.write_frequency(hz)?;
        info!(from = current, frequency = hz, "frequency stepped");
        self.refresh_display();
        Ok(hz)
    }

    /// Push the current store values to the display.
    ///
    /// Values that fail to read are skipped; the row keeps its last text.
    pub fn refresh_display(&mut self) {
        match self.store.read(Attribute::Mode) {
            Ok(mode) => self.display.set_mode(&mode),
            Err(e) => debug!(error = %e, "mode unavailable for display"),
        }
        match self.store.read_temperature() {
            Ok(celsius) => self.display.set_temperature(&celsius.to_string()),
            Err(e) => debug!(error = %e, "temperature unavailable for display"),
        }
        match self.store.read_frequency() {
            Ok(hz) if hz > 0 => self.display.set_frequency(&hz.to_string()),
            Ok(_) => {}
            Err(e) => debug!(error = %e, "frequency unavailable for display"),
        }
    }
}

impl<S: AttributeStore> ButtonObserver for Controller<S> {
    fn on_press(&mut self, button: &Button) {
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.pressed();
        }

        let result = match button.id() {
            ButtonId::K1 => self.increment_frequency().map(|_| ()),
            ButtonId::K2 => self.decrement_frequency().map(|_| ()),
            ButtonId::K3 => self.toggle_mode().map(|_| ()),
        };
        if let Err(e) = result {
            error!(button = %button.name(), error = %e, "button action failed");
        }
    }

    fn on_release(&mut self, _button: &Button) {
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.released();
        }
    }
}
