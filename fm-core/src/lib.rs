//! fanmgr Core Library
//!
//! Control logic for the fan manager daemon, independent of the event loop.
//!
//! # Module Structure
//!
//! - `hw/` - Sysfs GPIO access and the button state machine
//! - `attributes` - Attribute store boundary (mode, temperature, frequency)
//! - `controller` - Mode/frequency policy shared by buttons and IPC
//! - `display`, `led` - Status feedback
//! - `timer` - Bounded adaptive period
//! - `settings` - Daemon settings file
//!
//! # Example
//!
//! ```no_run
//! use fm_core::{Controller, StatusPanel, SysfsAttributes};
//! use fm_protocol::parse;
//!
//! let mut controller = Controller::new(SysfsAttributes::default(), Box::new(StatusPanel::new()));
//! controller.apply(parse("set_mode manual\n")).unwrap();
//! ```

pub mod hw;

pub mod attributes;
pub mod constants;
pub mod controller;
pub mod display;
pub mod led;
pub mod settings;
pub mod timer;

pub use attributes::{Attribute, AttributeStore, AttributeStoreExt, SysfsAttributes};
pub use controller::{Applied, Controller};
pub use display::{Display, Row, StatusPanel};
pub use hw::{
    Button, ButtonEvent, ButtonId, ButtonLevel, ButtonObserver, ButtonRegistry, SysfsGpio,
};
pub use led::{GpioLed, PressIndicator, StatusLed};
pub use settings::{load_settings, resolve_settings_path, AttributePaths, ButtonSpec, DaemonSettings};
pub use timer::AdaptivePeriod;

pub use fm_error::{FanmgrError, Result};
