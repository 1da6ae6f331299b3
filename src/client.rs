/*
 * This file is part of fanmgr.
 *
 * Copyright (C) 2025 fanmgr contributors
 *
 * fanmgr is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * fanmgr is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with fanmgr. If not, see <https://www.gnu.org/licenses/>.
 */

//! Client side of the command pipe
//!
//! Builds validated commands, writes them to the daemon's FIFO and reads
//! the current state straight from the attribute store.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use serde::Serialize;

use fm_core::{AttributeStore, AttributeStoreExt};
use fm_error::{FanmgrError, Result};
use fm_protocol::{parse_int_prefix, validate_frequency, Command, Mode};

/// `SetFrequency` from user input, checked against the accepted range
pub fn frequency_command(raw: &str) -> Result<Command> {
    let hz = validate_frequency(parse_int_prefix(raw))?;
    Ok(Command::SetFrequency(i64::from(hz)))
}

/// `SetMode` from user input (`auto` or `manual`)
pub fn mode_command(raw: &str) -> Result<Command> {
    Ok(Command::SetMode(raw.trim().parse::<Mode>()?))
}

/// Refuse a frequency change up front when the store reports auto mode.
///
/// The daemon drops such a command anyway; checking here lets the caller
/// report it. An unreadable mode is left for the daemon to decide.
pub fn ensure_manual_mode<S: AttributeStore>(store: &S) -> Result<()> {
    match store.read_mode() {
        Ok(Mode::Auto) => Err(FanmgrError::AutoModeActive),
        Ok(Mode::Manual) | Err(_) => Ok(()),
    }
}

/// Write one command line to the daemon.
///
/// The pipe is opened non-blocking so a missing reader fails at once
/// instead of hanging. The line goes out in a single write, which the
/// kernel keeps atomic below `PIPE_BUF`.
pub fn send_command(fifo: &Path, command: &Command) -> Result<()> {
    let channel_err = |source: io::Error| FanmgrError::Channel {
        path: fifo.to_path_buf(),
        source,
    };

    let mut pipe = OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(fifo)
        .map_err(|e| match e.raw_os_error() {
            Some(libc::ENOENT) | Some(libc::ENXIO) => {
                FanmgrError::DaemonNotRunning(fifo.display().to_string())
            }
            _ => channel_err(e),
        })?;

    let line = command.to_line();
    let written = pipe.write(line.as_bytes()).map_err(channel_err)?;
    if written != line.len() {
        return Err(channel_err(io::Error::new(
            io::ErrorKind::WriteZero,
            "short write on command pipe",
        )));
    }
    Ok(())
}

/// Snapshot of the attribute store; unreadable values are `None`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub mode: Option<String>,
    pub temperature: Option<i64>,
    pub frequency: Option<i64>,
}

impl Status {
    pub fn read<S: AttributeStore>(store: &S) -> Self {
        Self {
            mode: store.read_mode().ok().map(|m| m.to_string()),
            temperature: store.read_temperature().ok(),
            frequency: store.read_frequency().ok(),
        }
    }

    /// Human-readable form, one value per line
    pub fn render(&self) -> String {
        fn or_na<T: ToString>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "N/A".to_string())
        }
        format!(
            "Mode:        {}\nTemperature: {} C\nFrequency:   {} Hz",
            or_na(&self.mode),
            or_na(&self.temperature),
            or_na(&self.frequency)
        )
    }
}
