//! Daemon assembly
//!
//! Acquires the status LED, buttons and command pipe in order and hands
//! them to a [`Dispatcher`]. Signal handlers must already be installed:
//! a shutdown signal arriving here then only sets the flag, and the
//! acquired resources are released by their `Drop` impls once the loop
//! sees it.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use tracing::info;

use fm_core::display::HEADER;
use fm_core::{
    ButtonRegistry, Controller, DaemonSettings, GpioLed, StatusPanel, SysfsAttributes, SysfsGpio,
};
use fm_error::Result;

use crate::channel::CommandChannel;
use crate::dispatcher::Dispatcher;

pub fn build(
    settings: &DaemonSettings,
    shutdown: &'static AtomicBool,
) -> Result<Dispatcher<SysfsAttributes>> {
    let gpio = SysfsGpio::new(&settings.gpio_base);
    let led = settings
        .status_led_pin
        .map(|pin| GpioLed::open(gpio.clone(), pin))
        .transpose()?;

    for line in HEADER {
        info!("{}", line);
    }
    let panel = StatusPanel::new();

    let mut controller = Controller::new(
        SysfsAttributes::from_paths(&settings.attributes),
        Box::new(panel),
    );
    if let Some(led) = led {
        controller = controller.with_status_led(Box::new(led));
    }

    let mut registry = ButtonRegistry::new(gpio);
    for button in &settings.buttons {
        registry.register(button.pin, button.id, &button.name)?;
    }

    let channel = CommandChannel::create(&settings.fifo_path)?;

    let mut dispatcher = Dispatcher::new(registry, channel, controller, shutdown)?.with_timing(
        Duration::from_millis(settings.wait_timeout_ms),
        settings.refresh_every_ticks,
    );
    dispatcher.refresh_display();
    Ok(dispatcher)
}
