//! Constants and configuration defaults for fanmgr
//!
//! Centralizes paths, pin assignments and loop timing.
//! Settings fall back to these values when a field is absent.

/// System paths
pub mod paths {
    /// Operating mode attribute (`auto` / `manual`, read-write)
    pub const MODE_ATTR: &str = "/sys/devices/platform/csel/mode";

    /// CPU temperature attribute (integer Celsius, read-only)
    pub const TEMPERATURE_ATTR: &str = "/sys/devices/platform/csel/temp";

    /// Fan/LED blink frequency attribute (integer Hz, read-write)
    pub const FREQUENCY_ATTR: &str = "/sys/devices/platform/csel/blink_freq";

    /// Sysfs GPIO class directory
    pub const GPIO_BASE: &str = "/sys/class/gpio";

    /// Daemon settings file
    pub const SETTINGS_FILE: &str = "/etc/fanmgr/fanmgrd.json";

    /// Environment override for the settings file
    pub const SETTINGS_ENV: &str = "FANMGR_CONFIG";
}

/// Button and LED wiring (NanoPi NEO Plus2 expansion board)
pub mod buttons {
    /// Maximum number of buttons watched at once
    pub const MAX_BUTTONS: usize = 3;

    /// K1: increase frequency
    pub const K1_PIN: u32 = 0;

    /// K2: decrease frequency
    pub const K2_PIN: u32 = 2;

    /// K3: toggle mode
    pub const K3_PIN: u32 = 3;

    /// GPIOL10 / PWR-LED
    pub const STATUS_LED_PIN: u32 = 362;
}

/// Event loop timing
pub mod dispatcher {
    /// Readiness wait timeout in milliseconds
    pub const WAIT_TIMEOUT_MS: u64 = 1000;

    /// Refresh the display every N loop iterations even when idle
    pub const REFRESH_EVERY_TICKS: u32 = 5;

    /// Readiness events collected per wait
    pub const MAX_EVENTS: usize = 10;
}

/// Status panel layout
pub mod display {
    /// Characters per row (SSD1306 128px / 8px font)
    pub const COLUMNS: usize = 16;

    /// Shown until a value has been read
    pub const PLACEHOLDER: &str = "N/A";
}
