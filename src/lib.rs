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

//! fanmgr - fan manager client library
//!
//! Command construction, pipe delivery and status reporting behind the
//! `fanctl` binary.

pub mod cli;
pub mod client;

pub use client::{frequency_command, mode_command, send_command, Status};
