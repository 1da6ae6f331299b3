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

//! Command Line Interface
//!
//! `fanctl` sends one command per invocation to `fanmgrd`, or prints the
//! current state read from the attribute store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use fm_core::{load_settings, resolve_settings_path, DaemonSettings, SysfsAttributes};

use crate::client::{self, Status};

#[derive(Parser)]
#[command(name = "fanctl")]
#[command(version)]
#[command(about = "fanctl - control the fanmgrd fan manager")]
#[command(long_about = "fanctl - control the fanmgrd fan manager

EXAMPLES:
    fanctl mode manual          Switch to manual control
    fanctl freq 15              Set the frequency to 15 Hz (manual mode only)
    fanctl mode auto            Hand control back to the kernel
    fanctl status --json        Print mode, temperature and frequency

ENVIRONMENT VARIABLES:
    FANMGR_CONFIG          Daemon settings file (pipe and attribute paths)")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command pipe of the daemon
    #[arg(long, global = true, value_name = "PATH")]
    pub fifo: Option<PathBuf>,

    /// Daemon settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set the frequency in Hz (1-20, manual mode only)
    Freq {
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Set the operating mode (auto or manual)
    Mode { value: String },

    /// Show mode, temperature and frequency
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn settings(cli: &Cli) -> Result<DaemonSettings> {
    let path = resolve_settings_path(cli.config.as_deref());
    load_settings(&path).with_context(|| format!("loading settings from {}", path.display()))
}

pub fn run_cli(cli: &Cli) -> Result<()> {
    let settings = settings(cli)?;
    let fifo = cli.fifo.clone().unwrap_or(settings.fifo_path.clone());

    match &cli.command {
        Commands::Freq { value } => {
            let command = client::frequency_command(value)?;
            client::ensure_manual_mode(&SysfsAttributes::from_paths(&settings.attributes))?;
            client::send_command(&fifo, &command)
                .with_context(|| format!("sending frequency {}", value))?;
        }
        Commands::Mode { value } => {
            let command = client::mode_command(value)?;
            client::send_command(&fifo, &command)
                .with_context(|| format!("sending mode {}", value))?;
        }
        Commands::Status { json } => {
            let status = Status::read(&SysfsAttributes::from_paths(&settings.attributes));
            if *json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{}", status.render());
            }
        }
    }
    Ok(())
}
