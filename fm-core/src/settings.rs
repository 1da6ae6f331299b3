//! Daemon settings
//!
//! Optional JSON file, `/etc/fanmgr/fanmgrd.json` unless overridden.
//! Every field has a default, so a partial file (or none at all) is valid.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use fm_error::{FanmgrError, Result};

use crate::constants::{buttons, dispatcher, paths};
use crate::hw::ButtonId;

/// Locations of the three store attributes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AttributePaths {
    pub mode: PathBuf,
    pub temperature: PathBuf,
    pub frequency: PathBuf,
}

impl Default for AttributePaths {
    fn default() -> Self {
        Self {
            mode: PathBuf::from(paths::MODE_ATTR),
            temperature: PathBuf::from(paths::TEMPERATURE_ATTR),
            frequency: PathBuf::from(paths::FREQUENCY_ATTR),
        }
    }
}

/// One front-panel button binding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ButtonSpec {
    pub pin: u32,
    pub id: ButtonId,
    pub name: String,
}

impl ButtonSpec {
    fn new(pin: u32, id: ButtonId) -> Self {
        Self {
            pin,
            id,
            name: format!("{:?}", id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DaemonSettings {
    pub attributes: AttributePaths,
    pub fifo_path: PathBuf,
    pub gpio_base: PathBuf,
    pub buttons: Vec<ButtonSpec>,
    /// `null` runs without button feedback on the LED
    pub status_led_pin: Option<u32>,
    pub wait_timeout_ms: u64,
    pub refresh_every_ticks: u32,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            attributes: AttributePaths::default(),
            fifo_path: PathBuf::from(fm_protocol::FIFO_PATH),
            gpio_base: PathBuf::from(paths::GPIO_BASE),
            buttons: vec![
                ButtonSpec::new(buttons::K1_PIN, ButtonId::K1),
                ButtonSpec::new(buttons::K2_PIN, ButtonId::K2),
                ButtonSpec::new(buttons::K3_PIN, ButtonId::K3),
            ],
            status_led_pin: Some(buttons::STATUS_LED_PIN),
            wait_timeout_ms: dispatcher::WAIT_TIMEOUT_MS,
            refresh_every_ticks: dispatcher::REFRESH_EVERY_TICKS,
        }
    }
}

impl DaemonSettings {
    pub fn validate(&self) -> Result<()> {
        if self.buttons.len() > buttons::MAX_BUTTONS {
            return Err(FanmgrError::config(format!(
                "{} buttons configured, at most {} supported",
                self.buttons.len(),
                buttons::MAX_BUTTONS
            )));
        }

        let mut pins = HashSet::new();
        for button in &self.buttons {
            if !pins.insert(button.pin) {
                return Err(FanmgrError::config(format!(
                    "GPIO pin {} bound to more than one button",
                    button.pin
                )));
            }
        }

        if self.wait_timeout_ms == 0 {
            return Err(FanmgrError::config("wait_timeout_ms must be positive"));
        }
        if self.refresh_every_ticks == 0 {
            return Err(FanmgrError::config("refresh_every_ticks must be positive"));
        }
        Ok(())
    }
}

/// Explicit path, else `FANMGR_CONFIG`, else the system default
pub fn resolve_settings_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var_os(paths::SETTINGS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(paths::SETTINGS_FILE))
}

/// Load and validate settings. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<DaemonSettings> {
    let settings = match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str::<DaemonSettings>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            DaemonSettings::default()
        }
        Err(e) => {
            return Err(FanmgrError::config(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };

    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, DaemonSettings::default());
        assert_eq!(settings.buttons.len(), 3);
        assert_eq!(settings.buttons[0].name, "K1");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fanmgrd.json");
        fs::write(
            &path,
            r#"{ "fifo_path": "/run/fanmgr.fifo", "attributes": { "mode": "/tmp/mode" }, "status_led_pin": null }"#,
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.fifo_path, PathBuf::from("/run/fanmgr.fifo"));
        assert_eq!(settings.attributes.mode, PathBuf::from("/tmp/mode"));
        assert_eq!(settings.attributes.frequency, PathBuf::from(paths::FREQUENCY_ATTR));
        assert_eq!(settings.status_led_pin, None);
        assert_eq!(settings.wait_timeout_ms, 1000);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fanmgrd.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_settings(&path), Err(FanmgrError::JsonParse(_))));
    }

    #[test]
    fn test_validation() {
        let mut settings = DaemonSettings::default();
        settings.buttons.push(ButtonSpec::new(7, ButtonId::K1));
        assert!(settings.validate().is_err());

        let mut settings = DaemonSettings::default();
        settings.buttons[1].pin = settings.buttons[0].pin;
        assert!(settings.validate().is_err());

        let mut settings = DaemonSettings::default();
        settings.refresh_every_ticks = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = resolve_settings_path(Some(Path::new("/tmp/x.json")));
        assert_eq!(path, PathBuf::from("/tmp/x.json"));
    }
}
