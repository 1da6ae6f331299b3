//! Attribute store access
//!
//! The kernel-side fan controller exposes three sysfs attributes:
//! - `mode`: `auto` or `manual` (read-write)
//! - `temp`: CPU temperature in integer Celsius (read-only)
//! - `blink_freq`: fan/LED frequency in Hz (read-write)
//!
//! Every access opens, reads or writes, and closes the file. Nothing is
//! cached: the kernel recomputes the frequency on its own in auto mode,
//! so each read must observe the current value.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fm_error::{FanmgrError, Result};
use fm_protocol::Mode;

use crate::settings::AttributePaths;

/// One addressable attribute of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Mode,
    Temperature,
    Frequency,
}

impl Attribute {
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Mode => "mode",
            Attribute::Temperature => "temperature",
            Attribute::Frequency => "frequency",
        }
    }

    pub fn is_writable(self) -> bool {
        !matches!(self, Attribute::Temperature)
    }
}

/// Key-value boundary to the kernel-side controller.
///
/// Values are plain strings; typed access lives in [`AttributeStoreExt`].
#[cfg_attr(test, mockall::automock)]
pub trait AttributeStore {
    /// Read the first line of an attribute, without its terminator
    fn read(&self, attr: Attribute) -> Result<String>;

    /// Replace an attribute's value
    fn write(&self, attr: Attribute, value: &str) -> Result<()>;
}

/// Typed helpers over any [`AttributeStore`]
pub trait AttributeStoreExt: AttributeStore {
    fn read_mode(&self) -> Result<Mode> {
        let raw = self.read(Attribute::Mode)?;
        raw.parse::<Mode>().map_err(|_| invalid_value(Attribute::Mode, raw))
    }

    fn write_mode(&self, mode: Mode) -> Result<()> {
        self.write(Attribute::Mode, mode.as_str())
    }

    fn read_frequency(&self) -> Result<i64> {
        read_integer(self, Attribute::Frequency)
    }

    fn write_frequency(&self, hz: u8) -> Result<()> {
        self.write(Attribute::Frequency, &hz.to_string())
    }

    fn read_temperature(&self) -> Result<i64> {
        read_integer(self, Attribute::Temperature)
    }
}

impl<T: AttributeStore + ?Sized> AttributeStoreExt for T {}

fn read_integer<S: AttributeStore + ?Sized>(store: &S, attr: Attribute) -> Result<i64> {
    let raw = store.read(attr)?;
    raw.trim()
        .parse::<i64>()
        .map_err(|_| invalid_value(attr, raw))
}

fn invalid_value(attr: Attribute, value: String) -> FanmgrError {
    FanmgrError::InvalidAttributeValue {
        path: PathBuf::from(attr.name()),
        value,
    }
}

/// Attribute store backed by sysfs files
#[derive(Debug, Clone)]
pub struct SysfsAttributes {
    mode: PathBuf,
    temperature: PathBuf,
    frequency: PathBuf,
}

impl SysfsAttributes {
    pub fn new(
        mode: impl Into<PathBuf>,
        temperature: impl Into<PathBuf>,
        frequency: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mode: mode.into(),
            temperature: temperature.into(),
            frequency: frequency.into(),
        }
    }

    pub fn from_paths(paths: &AttributePaths) -> Self {
        Self::new(&paths.mode, &paths.temperature, &paths.frequency)
    }

    pub fn path(&self, attr: Attribute) -> &Path {
        match attr {
            Attribute::Mode => &self.mode,
            Attribute::Temperature => &self.temperature,
            Attribute::Frequency => &self.frequency,
        }
    }
}

impl Default for SysfsAttributes {
    fn default() -> Self {
        Self::from_paths(&AttributePaths::default())
    }
}

impl AttributeStore for SysfsAttributes {
    fn read(&self, attr: Attribute) -> Result<String> {
        let path = self.path(attr);
        let content = fs::read_to_string(path).map_err(|e| FanmgrError::AttributeRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(content.lines().next().unwrap_or("").trim_end().to_string())
    }

    fn write(&self, attr: Attribute, value: &str) -> Result<()> {
        if !attr.is_writable() {
            return Err(FanmgrError::ReadOnlyAttribute(attr.name().to_string()));
        }

        let path = self.path(attr);
        let map_err = |e| FanmgrError::AttributeWrite {
            path: path.to_path_buf(),
            source: e,
        };

        // sysfs attributes always exist; never create one
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(map_err)?;
        file.write_all(format!("{}\n", value).as_bytes())
            .map_err(map_err)
    }
}
