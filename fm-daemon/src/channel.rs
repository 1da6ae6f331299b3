//! IPC command channel
//!
//! A named pipe carrying newline-terminated command lines from `fanctl`.
//! The daemon keeps its own write end open: without it the read end
//! reports hang-up forever once the last client closes, and the
//! readiness wait would spin.

use std::ffi::CString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use fm_error::{FanmgrError, Result};
use fm_protocol::MAX_LINE_SIZE;

pub struct CommandChannel {
    path: PathBuf,
    reader: File,
    _keepalive: File,
    pending: Vec<u8>,
    discarding: bool,
}

impl CommandChannel {
    /// Replace whatever sits at `path` with a fresh FIFO and open it
    pub fn create(path: &Path) -> Result<Self> {
        let channel_err = |source: io::Error| FanmgrError::Channel {
            path: path.to_path_buf(),
            source,
        };

        match fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed stale command pipe"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(channel_err(e)),
        }

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| channel_err(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        // SAFETY: c_path is a valid NUL-terminated string.
        if unsafe { libc::mkfifo(c_path.as_ptr(), 0o666) } != 0 {
            return Err(channel_err(io::Error::last_os_error()));
        }
        // mkfifo honors the umask
        fs::set_permissions(path, fs::Permissions::from_mode(0o666)).map_err(channel_err)?;

        let reader = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(path)
            .map_err(channel_err)?;
        let keepalive = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(path)
            .map_err(channel_err)?;

        info!(path = %path.display(), "command pipe ready");
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            _keepalive: keepalive,
            pending: Vec::with_capacity(MAX_LINE_SIZE),
            discarding: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain the pipe and return every complete line received.
    ///
    /// A trailing partial line stays buffered until its terminator
    /// arrives. Blank lines are skipped; overlong lines are dropped.
    pub fn read_lines(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        let mut buf = [0u8; MAX_LINE_SIZE];

        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => self.split(&buf[..n], &mut lines),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(FanmgrError::Channel {
                        path: self.path.clone(),
                        source: e,
                    })
                }
            }
        }
        Ok(lines)
    }

    fn split(&mut self, bytes: &[u8], lines: &mut Vec<String>) {
        for &byte in bytes {
            if byte == b'\n' {
                if !self.discarding && !self.pending.is_empty() {
                    lines.push(String::from_utf8_lossy(&self.pending).into_owned());
                }
                self.pending.clear();
                self.discarding = false;
            } else if self.discarding {
                continue;
            } else if self.pending.len() >= MAX_LINE_SIZE {
                warn!(max = MAX_LINE_SIZE, "command line too long, discarding");
                self.pending.clear();
                self.discarding = true;
            } else {
                self.pending.push(byte);
            }
        }
    }
}

impl AsRawFd for CommandChannel {
    fn as_raw_fd(&self) -> RawFd {
        self.reader.as_raw_fd()
    }
}

impl Drop for CommandChannel {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove command pipe");
        }
    }
}
