//! Command protocol for the fanmgr control pipe
//!
//! Each message is one UTF-8 line terminated by `\n`:
//!
//! ```text
//! set_freq <1-20>
//! set_mode <auto|manual>
//! ```
//!
//! Parsing never fails. Anything outside the grammar becomes
//! [`Command::Unknown`] and is discarded by the daemon.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use fm_error::{FanmgrError, Result};

/// Default path of the daemon's command FIFO
pub const FIFO_PATH: &str = "/tmp/fanmgr_cmd";

/// Longest accepted command line, terminator excluded
pub const MAX_LINE_SIZE: usize = 256;

/// Lowest frequency the controller accepts (Hz)
pub const FREQ_MIN: u8 = 1;

/// Highest frequency the controller accepts (Hz)
pub const FREQ_MAX: u8 = 20;

const SET_FREQ_PREFIX: &str = "set_freq ";
const SET_MODE_PREFIX: &str = "set_mode ";

/// Operating mode of the fan controller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Kernel-side controller derives the frequency from temperature
    Auto,
    /// Frequency is set by buttons or `set_freq`
    Manual,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Manual => "manual",
        }
    }

    /// The opposite mode
    pub fn toggled(self) -> Self {
        match self {
            Mode::Auto => Mode::Manual,
            Mode::Manual => Mode::Auto,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = FanmgrError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Mode::Auto),
            "manual" => Ok(Mode::Manual),
            other => Err(FanmgrError::InvalidMode(other.to_string())),
        }
    }
}

/// A parsed control-pipe message. Built per line and consumed immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Raw requested value; range checking happens in the controller
    SetFrequency(i64),
    SetMode(Mode),
    Unknown(String),
}

impl Command {
    /// Encode as a single protocol line, terminator included
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Command::SetFrequency(_) => "SetFrequency",
            Command::SetMode(_) => "SetMode",
            Command::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetFrequency(value) => write!(f, "{}{}", SET_FREQ_PREFIX, value),
            Command::SetMode(mode) => write!(f, "{}{}", SET_MODE_PREFIX, mode),
            Command::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// Parse one line from the control pipe.
///
/// The frequency payload follows C `atoi` rules: a non-numeric token
/// yields `SetFrequency(0)`, which range validation later rejects.
pub fn parse(line: &str) -> Command {
    let body = line.trim_matches(|c| c == '\n' || c == '\r');

    if let Some(payload) = body.strip_prefix(SET_FREQ_PREFIX) {
        return Command::SetFrequency(parse_int_prefix(payload));
    }

    if let Some(payload) = body.strip_prefix(SET_MODE_PREFIX) {
        if let Ok(mode) = payload.trim_end().parse::<Mode>() {
            return Command::SetMode(mode);
        }
    }

    Command::Unknown(body.to_string())
}

/// Leading-integer parse: optional whitespace, optional sign, digits.
/// Stops at the first non-digit and returns 0 when no digit was seen.
pub fn parse_int_prefix(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add((d - b'0') as i64));

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Check a requested frequency against the accepted range
pub fn validate_frequency(value: i64) -> Result<u8> {
    if value < FREQ_MIN as i64 || value > FREQ_MAX as i64 {
        return Err(FanmgrError::InvalidFrequency {
            value,
            min: FREQ_MIN,
            max: FREQ_MAX,
        });
    }
    Ok(value as u8)
}

/// Saturate a frequency into the accepted range
pub fn clamp_frequency(value: i64) -> u8 {
    value.clamp(FREQ_MIN as i64, FREQ_MAX as i64) as u8
}
