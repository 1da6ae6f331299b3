//! Button state machine
//!
//! Each button is a GPIO input configured for `both` edges. The kernel
//! can signal an edge without the level having actually changed (contact
//! bounce, spurious wakeups), so every notification is confirmed by
//! reading the level and comparing it with the last one seen. Only a real
//! reversal reaches the observer.

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::os::unix::io::{AsRawFd, RawFd};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fm_error::{FanmgrError, Result};

use crate::constants::buttons::MAX_BUTTONS;
use crate::hw::gpio::{Direction, Edge, SysfsGpio};

/// Logical button identity on the front panel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ButtonId {
    K1,
    K2,
    K3,
}

/// Electrical state of a button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonLevel {
    Pressed,
    Released,
}

impl ButtonLevel {
    /// Value file content `1` means pressed
    fn from_value(byte: u8) -> Self {
        if byte == b'1' {
            ButtonLevel::Pressed
        } else {
            ButtonLevel::Released
        }
    }
}

/// Outcome of handling one edge notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    PressDetected,
    ReleaseDetected,
    NoChange,
}

/// Receives confirmed press/release transitions.
///
/// Called synchronously on the dispatcher thread; implementations must
/// return promptly.
pub trait ButtonObserver {
    fn on_press(&mut self, button: &Button);
    fn on_release(&mut self, button: &Button);
}

/// A registered button bound to its open value descriptor
#[derive(Debug)]
pub struct Button {
    pin: u32,
    id: ButtonId,
    name: String,
    value: File,
    last_state: ButtonLevel,
}

impl Button {
    pub fn pin(&self) -> u32 {
        self.pin
    }

    pub fn id(&self) -> ButtonId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn last_state(&self) -> ButtonLevel {
        self.last_state
    }

    fn read_level(&self) -> Result<ButtonLevel> {
        let mut buf = [0u8; 1];
        // sysfs value files must be re-read from offset 0 to re-arm the edge
        let n = self
            .value
            .read_at(&mut buf, 0)
            .map_err(|e| FanmgrError::gpio(self.pin, format!("read level failed: {}", e)))?;
        if n == 0 {
            return Err(FanmgrError::gpio(self.pin, "value file is empty"));
        }
        Ok(ButtonLevel::from_value(buf[0]))
    }
}

/// Arena of buttons addressed by registration index.
///
/// The index doubles as the readiness-wait tag for the button's descriptor.
#[derive(Debug)]
pub struct ButtonRegistry {
    gpio: SysfsGpio,
    buttons: Vec<Button>,
}

impl ButtonRegistry {
    pub fn new(gpio: SysfsGpio) -> Self {
        Self {
            gpio,
            buttons: Vec::with_capacity(MAX_BUTTONS),
        }
    }

    /// Export, configure and open a button pin.
    ///
    /// The current level is read once to seed the state and to clear the
    /// edge already pending on a freshly opened value file.
    pub fn register(&mut self, pin: u32, id: ButtonId, name: &str) -> Result<usize> {
        if self.buttons.len() >= MAX_BUTTONS {
            return Err(FanmgrError::RegistryFull { max: MAX_BUTTONS });
        }
        if self.buttons.iter().any(|b| b.pin == pin) {
            return Err(FanmgrError::DuplicatePin(pin));
        }

        self.gpio.export(pin)?;

        let button = match self.open_button(pin, id, name) {
            Ok(button) => button,
            Err(e) => {
                if let Err(unexport_err) = self.gpio.unexport(pin) {
                    debug!(pin, error = %unexport_err, "unexport after failed registration");
                }
                return Err(e);
            }
        };

        let index = self.buttons.len();
        debug!(
            pin,
            index,
            button = %button.name,
            state = ?button.last_state,
            "button registered"
        );
        self.buttons.push(button);
        Ok(index)
    }

    fn open_button(&self, pin: u32, id: ButtonId, name: &str) -> Result<Button> {
        self.gpio.set_direction(pin, Direction::In)?;
        self.gpio.set_edge(pin, Edge::Both)?;
        let value = self.gpio.open_value(pin)?;

        let mut button = Button {
            pin,
            id,
            name: name.to_string(),
            value,
            last_state: ButtonLevel::Released,
        };
        button.last_state = button.read_level()?;
        Ok(button)
    }

    /// Confirm an edge notification on the button at `index`.
    ///
    /// Returns `NoChange` when the level equals the last one seen; otherwise
    /// records the new level and calls the observer before returning.
    pub fn handle_event(
        &mut self,
        index: usize,
        observer: &mut dyn ButtonObserver,
    ) -> Result<ButtonEvent> {
        let button = self
            .buttons
            .get_mut(index)
            .ok_or(FanmgrError::UnknownButton(index))?;

        let level = button.read_level()?;
        if level == button.last_state {
            return Ok(ButtonEvent::NoChange);
        }
        button.last_state = level;

        match level {
            ButtonLevel::Pressed => {
                debug!(button = %button.name, "button pressed");
                observer.on_press(button);
                Ok(ButtonEvent::PressDetected)
            }
            ButtonLevel::Released => {
                debug!(button = %button.name, "button released");
                observer.on_release(button);
                Ok(ButtonEvent::ReleaseDetected)
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&Button> {
        self.buttons.get(index)
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    /// `(index, descriptor)` pairs for readiness registration
    pub fn descriptors(&self) -> impl Iterator<Item = (usize, RawFd)> + '_ {
        self.buttons
            .iter()
            .enumerate()
            .map(|(index, b)| (index, b.value.as_raw_fd()))
    }
}

impl Drop for ButtonRegistry {
    fn drop(&mut self) {
        for button in self.buttons.drain(..) {
            let pin = button.pin;
            drop(button);
            if let Err(e) = self.gpio.unexport(pin) {
                warn!(pin, error = %e, "failed to unexport button pin");
            }
        }
    }
}
