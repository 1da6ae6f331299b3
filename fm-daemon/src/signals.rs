//! Shutdown signals
//!
//! Hangup, interrupt, quit, abort, terminate and terminal-stop all set one
//! process-wide flag. The handler does nothing else. `SA_RESTART` is left
//! off so a blocked readiness wait returns `EINTR` and the loop notices
//! the flag straight away.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use fm_error::{FanmgrError, Result};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

pub const SHUTDOWN_SIGNALS: [libc::c_int; 6] = [
    libc::SIGHUP,
    libc::SIGINT,
    libc::SIGQUIT,
    libc::SIGABRT,
    libc::SIGTERM,
    libc::SIGTSTP,
];

extern "C" fn request_shutdown(_signal: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Flag set once any shutdown signal arrives
pub fn shutdown_flag() -> &'static AtomicBool {
    &SHUTDOWN
}

pub fn install() -> Result<()> {
    for &signal in &SHUTDOWN_SIGNALS {
        // SAFETY: the action is fully initialized before use and the handler
        // only performs an atomic store, which is async-signal-safe.
        let rc = unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = request_shutdown as extern "C" fn(libc::c_int) as libc::sighandler_t;
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(signal, &action, std::ptr::null_mut())
        };
        if rc != 0 {
            return Err(FanmgrError::Io(io::Error::last_os_error()));
        }
    }
    tracing::debug!("shutdown signal handlers installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_each_signal_sets_flag() {
        install().unwrap();
        for signal in SHUTDOWN_SIGNALS {
            SHUTDOWN.store(false, Ordering::SeqCst);
            // SAFETY: raise delivers to this thread; our handler is installed.
            assert_eq!(unsafe { libc::raise(signal) }, 0);
            assert!(shutdown_flag().load(Ordering::SeqCst));
        }
        SHUTDOWN.store(false, Ordering::SeqCst);
    }

    #[test]
    #[serial]
    fn test_install_is_repeatable() {
        install().unwrap();
        install().unwrap();
        assert!(!shutdown_flag().load(Ordering::SeqCst));
    }
}
