//! fanmgr daemon (fanmgrd)
//!
//! Watches the front-panel buttons and the command pipe, applies mode and
//! frequency changes to the kernel fan controller, and keeps the status
//! panel current.
//!
//! # Buttons
//! - **K1**: frequency +1 Hz (saturates at 20)
//! - **K2**: frequency -1 Hz (saturates at 1)
//! - **K3**: toggle auto/manual
//!
//! # Commands (one per line on the pipe)
//! - `set_freq <1-20>` (manual mode only)
//! - `set_mode <auto|manual>`

use std::path::PathBuf;

use tracing::{error, info};

use fm_core::{load_settings, resolve_settings_path};
use fm_daemon::{signals, startup};
use fm_error::Result;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// CLI
// ============================================================================

fn print_help() {
    eprintln!("fanmgrd {} - fan manager daemon", VERSION);
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("    fanmgrd [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("    -f, --foreground    Run in foreground (always on)");
    eprintln!("    -c, --config PATH   Settings file (default /etc/fanmgr/fanmgrd.json)");
    eprintln!("    -v, --version       Print version");
    eprintln!("    -h, --help          Print this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("    FANMGR_LOG          Log level (trace, debug, info, warn, error)");
    eprintln!("    FANMGR_CONFIG       Settings file when --config is not given");
}

fn print_version() {
    println!("fanmgrd {}", VERSION);
}

// ============================================================================
// Logging
// ============================================================================

fn init_logging() -> &'static str {
    let log_level = std::env::var("FANMGR_LOG").unwrap_or_else(|_| "info".to_string());

    if std::path::Path::new("/run/systemd/journal/socket").exists() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                use tracing_subscriber::prelude::*;
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(tracing_subscriber::EnvFilter::new(&log_level))
                    .init();
                return "systemd journal";
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(&log_level)
        .init();
    "stdout"
}

// ============================================================================
// Startup
// ============================================================================

fn run(config: Option<PathBuf>) -> Result<()> {
    let settings_path = resolve_settings_path(config.as_deref());
    let settings = load_settings(&settings_path)?;
    info!(path = %settings_path.display(), "STARTUP: settings loaded");

    // before any pin is exported, so a signal from here on still unwinds cleanly
    signals::install()?;

    let mut dispatcher = startup::build(&settings, signals::shutdown_flag())?;
    info!("STARTUP: initialization complete");

    dispatcher.run()
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut config = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                return;
            }
            "-v" | "--version" => {
                print_version();
                return;
            }
            "-f" | "--foreground" => {
                // Foreground mode is always on (no daemonization implemented)
            }
            "-c" | "--config" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config = Some(PathBuf::from(&args[i]));
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let sink = init_logging();
    info!("STARTUP: fanmgrd {} starting", VERSION);
    info!("STARTUP: Logging to {}", sink);

    // resources acquired in run() are released by their Drop impls on return
    match run(config) {
        Ok(()) => info!("SHUTDOWN: fanmgrd terminated gracefully"),
        Err(e) => {
            error!("fanmgrd failed: {}", e);
            std::process::exit(1);
        }
    }
}
