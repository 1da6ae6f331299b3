//! Sysfs GPIO access
//!
//! Legacy `/sys/class/gpio` interface: a pin is exported by writing its
//! number to `export`, which creates `gpioN/` with `direction`, `edge`
//! and `value`. With an edge configured, the kernel flags `value` as
//! priority-readable (`EPOLLPRI`) whenever the line transitions.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fm_error::{FanmgrError, Result};

use crate::constants::paths;

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

/// Which transitions raise an edge notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    None,
    Rising,
    Falling,
    Both,
}

impl Edge {
    pub fn as_str(self) -> &'static str {
        match self {
            Edge::None => "none",
            Edge::Rising => "rising",
            Edge::Falling => "falling",
            Edge::Both => "both",
        }
    }
}

/// Handle on a sysfs GPIO class directory
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    base: PathBuf,
}

impl SysfsGpio {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.base.join(format!("gpio{}", pin))
    }

    pub fn value_path(&self, pin: u32) -> PathBuf {
        self.pin_dir(pin).join("value")
    }

    fn write_file(&self, pin: u32, path: &Path, value: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;
        file.write_all(value.as_bytes())?;
        tracing::trace!(pin, path = %path.display(), value, "gpio write");
        Ok(())
    }

    /// Make a pin available to userspace. An already exported pin is fine.
    pub fn export(&self, pin: u32) -> Result<()> {
        if self.pin_dir(pin).exists() {
            return Ok(());
        }

        match self.write_file(pin, &self.base.join("export"), &pin.to_string()) {
            Ok(()) => Ok(()),
            Err(e) if e.raw_os_error() == Some(libc::EBUSY) => Ok(()),
            Err(e) => Err(FanmgrError::gpio(pin, format!("export failed: {}", e))),
        }
    }

    pub fn unexport(&self, pin: u32) -> Result<()> {
        self.write_file(pin, &self.base.join("unexport"), &pin.to_string())
            .map_err(|e| FanmgrError::gpio(pin, format!("unexport failed: {}", e)))
    }

    pub fn set_direction(&self, pin: u32, direction: Direction) -> Result<()> {
        self.write_file(pin, &self.pin_dir(pin).join("direction"), direction.as_str())
            .map_err(|e| {
                FanmgrError::gpio(pin, format!("set direction {} failed: {}", direction.as_str(), e))
            })
    }

    pub fn set_edge(&self, pin: u32, edge: Edge) -> Result<()> {
        self.write_file(pin, &self.pin_dir(pin).join("edge"), edge.as_str())
            .map_err(|e| FanmgrError::gpio(pin, format!("set edge {} failed: {}", edge.as_str(), e)))
    }

    pub fn write(&self, pin: u32, high: bool) -> Result<()> {
        self.write_file(pin, &self.value_path(pin), if high { "1" } else { "0" })
            .map_err(|e| FanmgrError::gpio(pin, format!("write failed: {}", e)))
    }

    pub fn read(&self, pin: u32) -> Result<bool> {
        let content = std::fs::read_to_string(self.value_path(pin))
            .map_err(|e| FanmgrError::gpio(pin, format!("read failed: {}", e)))?;
        Ok(content.starts_with('1'))
    }

    /// Open the value file read-only, for edge notification and level reads
    pub fn open_value(&self, pin: u32) -> Result<File> {
        File::open(self.value_path(pin))
            .map_err(|e| FanmgrError::gpio(pin, format!("open value failed: {}", e)))
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new(paths::GPIO_BASE)
    }
}

/// Build a fake GPIO class directory for tests.
///
/// Each listed pin gets a pre-created `gpioN/` holding `direction`,
/// `edge` and `value`, as if the kernel had already exported it.
#[cfg(test)]
pub(crate) fn fake_gpio_tree(pins: &[(u32, &str)]) -> (tempfile::TempDir, SysfsGpio) {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("export"), "").unwrap();
    std::fs::write(dir.path().join("unexport"), "").unwrap();
    for (pin, level) in pins {
        let pin_dir = dir.path().join(format!("gpio{}", pin));
        std::fs::create_dir(&pin_dir).unwrap();
        std::fs::write(pin_dir.join("direction"), "in").unwrap();
        std::fs::write(pin_dir.join("edge"), "none").unwrap();
        std::fs::write(pin_dir.join("value"), level).unwrap();
    }
    let gpio = SysfsGpio::new(dir.path());
    (dir, gpio)
}
