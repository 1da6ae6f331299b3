//! Unified error handling for fanmgr
//!
//! A single error type shared by the protocol, core and daemon crates.
//! Variants are grouped by the failure class the daemon reacts to:
//! setup failures end the process, transient I/O is logged and dropped,
//! protocol errors and policy violations are rejected with a warning.

use std::io;
use std::path::PathBuf;

/// Result type alias using FanmgrError
pub type Result<T> = std::result::Result<T, FanmgrError>;

/// Unified error type for all fanmgr operations
#[derive(thiserror::Error, Debug)]
pub enum FanmgrError {
    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ============================================================================
    // Attribute Store Errors
    // ============================================================================
    #[error("Failed to read attribute {path}: {source}")]
    AttributeRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write attribute {path}: {source}")]
    AttributeWrite {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Attribute {path} holds an unexpected value: {value:?}")]
    InvalidAttributeValue {
        path: PathBuf,
        value: String,
    },

    #[error("Attribute is read-only: {0}")]
    ReadOnlyAttribute(String),

    // ============================================================================
    // GPIO and Button Errors
    // ============================================================================
    #[error("GPIO {pin}: {reason}")]
    Gpio {
        pin: u32,
        reason: String,
    },

    #[error("Button registry is full (max {max} buttons)")]
    RegistryFull {
        max: usize,
    },

    #[error("GPIO pin {0} is already bound to a button")]
    DuplicatePin(u32),

    #[error("No button registered at index {0}")]
    UnknownButton(usize),

    // ============================================================================
    // Event Loop and IPC Errors
    // ============================================================================
    #[error("Command channel {path}: {source}")]
    Channel {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Readiness wait failed: {0}")]
    Epoll(io::Error),

    #[error("fanmgr daemon not running ({0})")]
    DaemonNotRunning(String),

    // ============================================================================
    // Protocol and Policy Errors
    // ============================================================================
    #[error("Invalid frequency value: {value} (must be {min}-{max} Hz)")]
    InvalidFrequency {
        value: i64,
        min: u8,
        max: u8,
    },

    #[error("Invalid mode value: {0:?} (must be 'auto' or 'manual')")]
    InvalidMode(String),

    #[error("Cannot set frequency in auto mode - switch to manual mode first")]
    AutoModeActive,

    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl FanmgrError {
    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a GPIO error for a pin
    pub fn gpio(pin: u32, reason: impl Into<String>) -> Self {
        Self::Gpio {
            pin,
            reason: reason.into(),
        }
    }

    /// True for input the daemon refuses on purpose: malformed or out of
    /// range values, unknown commands and the auto-mode policy.
    /// These are logged as warnings and never touch the attribute store.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidFrequency { .. }
                | Self::InvalidMode(_)
                | Self::AutoModeActive
                | Self::UnknownCommand(_)
        )
    }

    /// True when a write was refused because automatic control is active
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::AutoModeActive)
    }
}
