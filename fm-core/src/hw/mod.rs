//! Hardware interaction modules
//!
//! Sysfs GPIO access and the button state machine built on top of it.

pub mod button;
pub mod gpio;

pub use button::{Button, ButtonEvent, ButtonId, ButtonLevel, ButtonObserver, ButtonRegistry};
pub use gpio::{Direction, Edge, SysfsGpio};
