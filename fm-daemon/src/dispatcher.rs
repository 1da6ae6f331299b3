//! Event dispatcher
//!
//! One thread, one readiness wait. Button value files are watched for
//! priority events and tagged with their registry index; the command pipe
//! is watched for input under its own token. Every wake that delivered
//! events ends with a display refresh, and every `refresh_every` loop
//! iterations the display is refreshed regardless.

use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use fm_core::constants::dispatcher::{MAX_EVENTS, REFRESH_EVERY_TICKS, WAIT_TIMEOUT_MS};
use fm_core::{AttributeStore, ButtonEvent, ButtonRegistry, Controller};
use fm_error::Result;

use crate::channel::CommandChannel;
use crate::epoll::{Epoll, Interest, Ready, WaitOutcome};

/// Token of the command pipe; buttons use their registry index
const CHANNEL_TOKEN: u64 = u64::MAX;

pub struct Dispatcher<S: AttributeStore> {
    epoll: Epoll,
    registry: ButtonRegistry,
    channel: CommandChannel,
    controller: Controller<S>,
    shutdown: &'static AtomicBool,
    timeout: Duration,
    refresh_every: u64,
    ticks: u64,
    ready: Vec<Ready>,
}

impl<S: AttributeStore> Dispatcher<S> {
    /// Take ownership of the event sources and register them for waiting
    pub fn new(
        registry: ButtonRegistry,
        channel: CommandChannel,
        controller: Controller<S>,
        shutdown: &'static AtomicBool,
    ) -> Result<Self> {
        let epoll = Epoll::new(MAX_EVENTS)?;
        for (index, fd) in registry.descriptors() {
            epoll.add(fd, Interest::Priority, index as u64)?;
        }
        epoll.add(channel.as_raw_fd(), Interest::Readable, CHANNEL_TOKEN)?;

        Ok(Self {
            epoll,
            registry,
            channel,
            controller,
            shutdown,
            timeout: Duration::from_millis(WAIT_TIMEOUT_MS),
            refresh_every: u64::from(REFRESH_EVERY_TICKS),
            ticks: 0,
            ready: Vec::with_capacity(MAX_EVENTS),
        })
    }

    /// Override the wait timeout and the idle refresh interval
    pub fn with_timing(mut self, timeout: Duration, refresh_every: u32) -> Self {
        self.timeout = timeout;
        self.refresh_every = u64::from(refresh_every.max(1));
        self
    }

    pub fn controller(&self) -> &Controller<S> {
        &self.controller
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn refresh_display(&mut self) {
        self.controller.refresh_display();
    }

    /// Loop until the shutdown flag is raised.
    ///
    /// Only a failing readiness wait ends the loop with an error.
    pub fn run(&mut self) -> Result<()> {
        info!(
            buttons = self.registry.len(),
            pipe = %self.channel.path().display(),
            "dispatcher running"
        );
        while !self.shutdown.load(Ordering::SeqCst) {
            self.run_once()?;
        }
        info!(ticks = self.ticks, "shutdown requested, dispatcher stopped");
        Ok(())
    }

    /// One wait plus the processing of whatever it returned
    pub fn run_once(&mut self) -> Result<()> {
        let mut ready = std::mem::take(&mut self.ready);
        let outcome = self.epoll.wait(&mut ready, self.timeout);

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.ready = ready;
                error!(error = %e, "readiness wait failed");
                return Err(e);
            }
        };

        match outcome {
            WaitOutcome::Interrupted => {
                debug!("wait interrupted by signal");
                self.ready = ready;
                return Ok(());
            }
            WaitOutcome::TimedOut => {}
            WaitOutcome::Events(_) => {
                for event in &ready {
                    if event.token == CHANNEL_TOKEN {
                        self.process_channel();
                    } else {
                        self.process_button(event);
                    }
                }
                self.controller.refresh_display();
            }
        }
        self.ready = ready;

        self.ticks += 1;
        if self.ticks % self.refresh_every == 0 {
            self.controller.refresh_display();
        }
        Ok(())
    }

    fn process_button(&mut self, event: &Ready) {
        let index = event.token as usize;
        if event.is_error() {
            debug!(index, "error condition on button descriptor");
        }
        match self.registry.handle_event(index, &mut self.controller) {
            Ok(ButtonEvent::NoChange) => debug!(index, "spurious edge ignored"),
            Ok(_) => {}
            Err(e) => error!(index, error = %e, "button read failed"),
        }
    }

    fn process_channel(&mut self) {
        let lines = match self.channel.read_lines() {
            Ok(lines) => lines,
            Err(e) => {
                error!(error = %e, "command pipe read failed");
                return;
            }
        };

        for line in lines {
            self.handle_line(&line);
        }
    }

    fn handle_line(&mut self, line: &str) -> LineOutcome {
        let command = fm_protocol::parse(line);
        debug!(command = command.type_name(), "command received");
        match self.controller.apply(command) {
            Ok(applied) => {
                debug!(?applied, "command applied");
                LineOutcome::Applied
            }
            Err(e) if e.is_policy_violation() => {
                warn!(line = %line, error = %e, "command refused by auto mode");
                LineOutcome::Refused
            }
            Err(e) if e.is_rejection() => {
                warn!(line = %line, error = %e, "command rejected");
                LineOutcome::Rejected
            }
            Err(e) => {
                error!(line = %line, error = %e, "command failed");
                LineOutcome::Failed
            }
        }
    }
}

/// How one command line was dealt with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOutcome {
    Applied,
    /// Valid command blocked by the auto-mode policy
    Refused,
    /// Malformed or out-of-range input
    Rejected,
    /// Attribute store I/O failed
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fm_core::{Display, SysfsAttributes, SysfsGpio};
    use std::cell::Cell;
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use std::rc::Rc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;
    use serial_test::serial;
    use tempfile::TempDir;

    /// Counts refreshes through the mode setter
    #[derive(Clone, Default)]
    struct CountingDisplay(Rc<Cell<u32>>);

    impl Display for CountingDisplay {
        fn set_mode(&mut self, _mode: &str) {
            self.0.set(self.0.get() + 1);
        }
        fn set_temperature(&mut self, _celsius: &str) {}
        fn set_frequency(&mut self, _hz: &str) {}
    }

    // dispatcher first: it must unlink the pipe before the directory goes
    struct Fixture {
        dispatcher: Dispatcher<SysfsAttributes>,
        refreshes: CountingDisplay,
        dir: TempDir,
    }

    fn fixture(mode: &str) -> Fixture {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mode"), format!("{}\n", mode)).unwrap();
        fs::write(dir.path().join("temp"), "38\n").unwrap();
        fs::write(dir.path().join("blink_freq"), "2\n").unwrap();
        fs::create_dir(dir.path().join("gpio")).unwrap();

        let store = SysfsAttributes::new(
            dir.path().join("mode"),
            dir.path().join("temp"),
            dir.path().join("blink_freq"),
        );
        let refreshes = CountingDisplay::default();
        let controller = Controller::new(store, Box::new(refreshes.clone()));
        let registry = ButtonRegistry::new(SysfsGpio::new(dir.path().join("gpio")));
        let channel = CommandChannel::create(&dir.path().join("cmd")).unwrap();
        let shutdown: &'static AtomicBool = Box::leak(Box::new(AtomicBool::new(false)));

        let dispatcher = Dispatcher::new(registry, channel, controller, shutdown)
            .unwrap()
            .with_timing(Duration::from_millis(10), 5);
        Fixture {
            dispatcher,
            refreshes,
            dir,
        }
    }

    fn send(fixture: &Fixture, text: &str) {
        let mut pipe = OpenOptions::new()
            .write(true)
            .open(fixture.dir.path().join("cmd"))
            .unwrap();
        pipe.write_all(text.as_bytes()).unwrap();
    }

    fn stored(fixture: &Fixture, name: &str) -> String {
        fs::read_to_string(fixture.dir.path().join(name))
            .unwrap()
            .trim()
            .to_string()
    }

    #[test]
    fn test_idle_refresh_every_fifth_tick() {
        let mut f = fixture("auto");
        for _ in 0..4 {
            f.dispatcher.run_once().unwrap();
        }
        assert_eq!(f.refreshes.0.get(), 0);
        f.dispatcher.run_once().unwrap();
        assert_eq!(f.refreshes.0.get(), 1);
        assert_eq!(f.dispatcher.ticks(), 5);
    }

    #[test]
    fn test_commands_are_applied_then_display_refreshed() {
        let mut f = fixture("auto");
        send(&f, "set_mode manual\nset_freq 15\n");
        f.dispatcher.run_once().unwrap();

        assert_eq!(stored(&f, "mode"), "manual");
        assert_eq!(stored(&f, "blink_freq"), "15");
        // two successful mutations plus the post-event refresh
        assert_eq!(f.refreshes.0.get(), 3);
    }

    #[test]
    fn test_rejected_commands_leave_store_untouched() {
        let mut f = fixture("manual");
        send(&f, "set_freq 25\nset_freq abc\nset_mode turbo\nhello\n");
        f.dispatcher.run_once().unwrap();
        assert_eq!(stored(&f, "blink_freq"), "2");
        assert_eq!(stored(&f, "mode"), "manual");
    }

    #[test]
    fn test_auto_mode_rejects_frequency() {
        let mut f = fixture("auto");
        send(&f, "set_freq 10\n");
        f.dispatcher.run_once().unwrap();
        assert_eq!(stored(&f, "blink_freq"), "2");
    }

    #[test]
    fn test_policy_refusal_is_told_apart_from_bad_input() {
        let mut f = fixture("auto");
        assert_eq!(f.dispatcher.handle_line("set_freq 10"), LineOutcome::Refused);
        assert_eq!(f.dispatcher.handle_line("set_freq 25"), LineOutcome::Refused);
        assert_eq!(f.dispatcher.handle_line("hello"), LineOutcome::Rejected);
        assert_eq!(f.dispatcher.handle_line("set_mode manual"), LineOutcome::Applied);
        assert_eq!(f.dispatcher.handle_line("set_freq 25"), LineOutcome::Rejected);

        fs::remove_file(f.dir.path().join("blink_freq")).unwrap();
        assert_eq!(f.dispatcher.handle_line("set_freq 5"), LineOutcome::Failed);
    }

    #[test]
    #[serial]
    fn test_signal_during_wait_is_not_an_error() {
        crate::signals::install().unwrap();

        let (tid_tx, tid_rx) = mpsc::channel();
        let waiter = thread::spawn(move || {
            let mut f = fixture("auto");
            f.dispatcher = f.dispatcher.with_timing(Duration::from_secs(5), 5);
            // SAFETY: pthread_self has no preconditions.
            tid_tx.send(unsafe { libc::pthread_self() }).unwrap();
            let started = Instant::now();
            let result = f.dispatcher.run_once();
            (result.is_ok(), f.dispatcher.ticks(), started.elapsed())
        });

        let tid = tid_rx.recv().unwrap();
        thread::sleep(Duration::from_millis(200));
        // SAFETY: the waiter thread is alive until it is joined below.
        assert_eq!(unsafe { libc::pthread_kill(tid, libc::SIGHUP) }, 0);

        let (ok, ticks, elapsed) = waiter.join().unwrap();
        crate::signals::shutdown_flag().store(false, Ordering::SeqCst);

        assert!(ok);
        // an interrupted wait is retried, not counted
        assert_eq!(ticks, 0);
        assert!(elapsed < Duration::from_secs(4));
    }

    #[test]
    fn test_run_stops_on_shutdown_flag() {
        let mut f = fixture("auto");
        f.dispatcher.shutdown.store(true, Ordering::SeqCst);
        f.dispatcher.run().unwrap();
        assert_eq!(f.dispatcher.ticks(), 0);
    }
}
