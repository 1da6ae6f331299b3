/*
 * Integration tests for fanmgr
 *
 * These tests run a live dispatcher against a fake attribute store and a
 * real command pipe, and drive it through the client functions that
 * `fanctl` uses.
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use fanmgr::{frequency_command, mode_command, send_command, Status};
use fm_core::{
    ButtonId, ButtonRegistry, Controller, StatusPanel, SysfsAttributes, SysfsGpio,
};
use fm_daemon::{CommandChannel, Dispatcher};
use fm_error::FanmgrError;
use fm_protocol::Command;
use serial_test::serial;
use tempfile::TempDir;

// Test utilities
fn fake_store(dir: &Path, mode: &str, freq: &str) -> SysfsAttributes {
    fs::write(dir.join("mode"), format!("{}\n", mode)).unwrap();
    fs::write(dir.join("temp"), "45\n").unwrap();
    fs::write(dir.join("blink_freq"), format!("{}\n", freq)).unwrap();
    SysfsAttributes::new(dir.join("mode"), dir.join("temp"), dir.join("blink_freq"))
}

fn stored(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap().trim().to_string()
}

/// Poll until the attribute holds `expected` or two seconds pass
fn wait_for(dir: &Path, name: &str, expected: &str) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if stored(dir, name) == expected {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

struct Daemon {
    fifo: PathBuf,
    shutdown: &'static AtomicBool,
    handle: Option<JoinHandle<()>>,
}

impl Daemon {
    /// Start a dispatcher thread without buttons on `dir`
    fn start(dir: &Path) -> Self {
        let fifo = dir.join("fanmgr_cmd");
        let shutdown: &'static AtomicBool = Box::leak(Box::new(AtomicBool::new(false)));
        let (ready_tx, ready_rx) = mpsc::channel();

        let dir = dir.to_path_buf();
        let pipe = fifo.clone();
        let handle = thread::spawn(move || {
            let store = SysfsAttributes::new(dir.join("mode"), dir.join("temp"), dir.join("blink_freq"));
            let controller = Controller::new(store, Box::new(StatusPanel::new()));
            fs::create_dir_all(dir.join("gpio")).unwrap();
            let registry = ButtonRegistry::new(SysfsGpio::new(dir.join("gpio")));
            let channel = CommandChannel::create(&pipe).unwrap();

            let mut dispatcher = Dispatcher::new(registry, channel, controller, shutdown)
                .unwrap()
                .with_timing(Duration::from_millis(20), 5);
            dispatcher.refresh_display();
            ready_tx.send(()).unwrap();
            dispatcher.run().unwrap();
        });

        ready_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        Self {
            fifo,
            shutdown,
            handle: Some(handle),
        }
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        self.stop();
    }
}

#[test]
#[serial]
fn test_manual_mode_then_frequency() {
    let dir = TempDir::new().unwrap();
    fake_store(dir.path(), "auto", "3");
    let mut daemon = Daemon::start(dir.path());

    send_command(&daemon.fifo, &mode_command("manual").unwrap()).unwrap();
    assert!(wait_for(dir.path(), "mode", "manual"));

    send_command(&daemon.fifo, &frequency_command("15").unwrap()).unwrap();
    assert!(wait_for(dir.path(), "blink_freq", "15"));

    // rejected by the client before anything is sent
    assert!(matches!(
        frequency_command("25"),
        Err(FanmgrError::InvalidFrequency { value: 25, .. })
    ));

    // and by the daemon when sent raw
    send_command(&daemon.fifo, &Command::SetFrequency(25)).unwrap();
    send_command(&daemon.fifo, &Command::SetMode(fm_protocol::Mode::Manual)).unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(stored(dir.path(), "blink_freq"), "15");

    daemon.stop();
    assert!(!daemon.fifo.exists());
}

#[test]
#[serial]
fn test_auto_mode_ignores_frequency() {
    let dir = TempDir::new().unwrap();
    fake_store(dir.path(), "auto", "6");
    let daemon = Daemon::start(dir.path());

    send_command(&daemon.fifo, &frequency_command("11").unwrap()).unwrap();
    send_command(&daemon.fifo, &mode_command("auto").unwrap()).unwrap();
    thread::sleep(Duration::from_millis(100));

    assert_eq!(stored(dir.path(), "blink_freq"), "6");
    assert_eq!(stored(dir.path(), "mode"), "auto");
}

#[test]
#[serial]
fn test_garbage_lines_do_not_stop_the_daemon() {
    let dir = TempDir::new().unwrap();
    fake_store(dir.path(), "manual", "6");
    let daemon = Daemon::start(dir.path());

    send_command(&daemon.fifo, &Command::Unknown("reboot now".to_string())).unwrap();
    send_command(&daemon.fifo, &Command::Unknown("set_freq".to_string())).unwrap();
    send_command(&daemon.fifo, &Command::SetFrequency(9)).unwrap();
    assert!(wait_for(dir.path(), "blink_freq", "9"));
}

#[test]
#[serial]
fn test_no_daemon_is_reported() {
    let dir = TempDir::new().unwrap();
    let err = send_command(&dir.path().join("fanmgr_cmd"), &Command::SetFrequency(5)).unwrap_err();
    assert!(matches!(err, FanmgrError::DaemonNotRunning(_)));
}

#[test]
fn test_increase_button_saturates() {
    let dir = TempDir::new().unwrap();
    let gpio_dir = dir.path().join("gpio");
    let pin_dir = gpio_dir.join("gpio0");
    fs::create_dir_all(&pin_dir).unwrap();
    fs::write(gpio_dir.join("export"), "").unwrap();
    fs::write(gpio_dir.join("unexport"), "").unwrap();
    fs::write(pin_dir.join("direction"), "in").unwrap();
    fs::write(pin_dir.join("edge"), "none").unwrap();
    fs::write(pin_dir.join("value"), "0").unwrap();

    let store = fake_store(dir.path(), "manual", "18");
    let mut controller = Controller::new(store, Box::new(StatusPanel::new()));
    let mut registry = ButtonRegistry::new(SysfsGpio::new(&gpio_dir));
    let k1 = registry.register(0, ButtonId::K1, "K1").unwrap();
    assert_eq!(stored(&pin_dir, "edge"), "both");

    let mut sequence = Vec::new();
    for _ in 0..3 {
        fs::write(pin_dir.join("value"), "1").unwrap();
        registry.handle_event(k1, &mut controller).unwrap();
        // repeated notification without a level change
        registry.handle_event(k1, &mut controller).unwrap();
        sequence.push(stored(dir.path(), "blink_freq"));
        fs::write(pin_dir.join("value"), "0").unwrap();
        registry.handle_event(k1, &mut controller).unwrap();
    }
    assert_eq!(sequence, vec!["19", "20", "20"]);
}

#[test]
fn test_status_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = fake_store(dir.path(), "manual", "12");
    let status = Status::read(&store);
    assert_eq!(status.mode.as_deref(), Some("manual"));
    assert_eq!(status.temperature, Some(45));
    assert_eq!(status.frequency, Some(12));

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["frequency"], 12);
}
