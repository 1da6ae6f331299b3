//! Readiness wait
//!
//! Thin owner of an epoll instance. Each registered descriptor carries an
//! opaque `u64` token that is handed back when it becomes ready.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

use fm_error::{FanmgrError, Result};

/// What a descriptor is watched for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    /// Data available (pipes)
    Readable,
    /// Priority data or error (sysfs GPIO edges)
    Priority,
}

impl Interest {
    fn bits(self) -> u32 {
        match self {
            Interest::Readable => libc::EPOLLIN as u32,
            Interest::Priority => (libc::EPOLLPRI | libc::EPOLLERR) as u32,
        }
    }
}

/// A descriptor reported ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready {
    pub token: u64,
    pub events: u32,
}

impl Ready {
    pub fn is_error(&self) -> bool {
        self.events & libc::EPOLLERR as u32 != 0
    }
}

/// Result of one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Events(usize),
    TimedOut,
    /// A caught signal cut the wait short
    Interrupted,
}

pub struct Epoll {
    fd: OwnedFd,
    events: Vec<libc::epoll_event>,
}

impl Epoll {
    pub fn new(max_events: usize) -> Result<Self> {
        // SAFETY: epoll_create1 has no memory-safety preconditions.
        let raw = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if raw < 0 {
            return Err(FanmgrError::Epoll(io::Error::last_os_error()));
        }
        // SAFETY: raw is a freshly created descriptor owned by nobody else.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        Ok(Self {
            fd,
            events: vec![libc::epoll_event { events: 0, u64: 0 }; max_events.max(1)],
        })
    }

    pub fn add(&self, fd: RawFd, interest: Interest, token: u64) -> Result<()> {
        let mut event = libc::epoll_event {
            events: interest.bits(),
            u64: token,
        };
        // SAFETY: event is a valid, initialized epoll_event for the duration of the call.
        let rc = unsafe {
            libc::epoll_ctl(self.fd.as_raw_fd(), libc::EPOLL_CTL_ADD, fd, &mut event)
        };
        if rc < 0 {
            return Err(FanmgrError::Epoll(io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Block until a descriptor is ready or `timeout` elapses.
    ///
    /// `ready` is cleared and refilled with the reported descriptors.
    pub fn wait(&mut self, ready: &mut Vec<Ready>, timeout: Duration) -> Result<WaitOutcome> {
        ready.clear();
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);

        // SAFETY: the buffer holds `events.len()` initialized entries and
        // the kernel writes at most that many.
        let n = unsafe {
            libc::epoll_wait(
                self.fd.as_raw_fd(),
                self.events.as_mut_ptr(),
                self.events.len() as i32,
                timeout_ms,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(WaitOutcome::Interrupted);
            }
            return Err(FanmgrError::Epoll(err));
        }
        if n == 0 {
            return Ok(WaitOutcome::TimedOut);
        }

        for event in &self.events[..n as usize] {
            // copy out of the (possibly packed) struct
            let token = event.u64;
            let events = event.events;
            ready.push(Ready { token, events });
        }
        Ok(WaitOutcome::Events(n as usize))
    }
}
