//! Shared fakes for supervisor integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use driver_supervisor::config::SupervisorConfig;
use driver_supervisor::device::DeviceId;
use driver_supervisor::manager::{
    DeviceLibrary, DeviceManager, ManagerError, ManagerOptions, Notification, NotificationEvent,
    NotificationKind, NotificationSender,
};
use driver_supervisor::{EventLoop, SessionApi};

/// How the fake library answers a blocking call.
#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    Succeed,
    Fail,
    Hang(Duration),
}

/// Observable state shared by the fake library and the test.
pub struct FakeState {
    pub added: AtomicUsize,
    pub removed: AtomicUsize,
    pub attached: AtomicUsize,
    pub overlapped: AtomicBool,
    pub stopped: AtomicBool,
    pub delivered: AtomicUsize,
    pub released: AtomicUsize,
    activation: Mutex<Behaviour>,
    removal: Mutex<Behaviour>,
}

impl FakeState {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn set_activation(&self, behaviour: Behaviour) {
        *self.activation.lock().unwrap() = behaviour;
    }

    pub fn set_removal(&self, behaviour: Behaviour) {
        *self.removal.lock().unwrap() = behaviour;
    }
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            added: AtomicUsize::new(0),
            removed: AtomicUsize::new(0),
            attached: AtomicUsize::new(0),
            overlapped: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            delivered: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            activation: Mutex::new(Behaviour::Succeed),
            removal: Mutex::new(Behaviour::Succeed),
        }
    }
}

/// Scriptable stand-in for the native library.
pub struct FakeLibrary {
    pub state: Arc<FakeState>,
}

impl FakeLibrary {
    pub fn new() -> (Self, Arc<FakeState>) {
        let state = Arc::new(FakeState::default());
        (Self { state: state.clone() }, state)
    }
}

impl DeviceLibrary for FakeLibrary {
    type Manager = FakeManager;

    fn start_manager(
        &mut self,
        _options: &ManagerOptions,
        notifications: NotificationSender,
    ) -> Result<FakeManager, ManagerError> {
        Ok(FakeManager {
            state: self.state.clone(),
            notifications,
        })
    }
}

pub struct FakeManager {
    state: Arc<FakeState>,
    notifications: NotificationSender,
}

impl DeviceManager for FakeManager {
    fn add_driver(&mut self, _device: &DeviceId) -> bool {
        self.state.added.fetch_add(1, Ordering::SeqCst);
        let behaviour = *self.state.activation.lock().unwrap();
        match behaviour {
            Behaviour::Fail => return false,
            Behaviour::Hang(duration) => std::thread::sleep(duration),
            Behaviour::Succeed => {}
        }

        if self.state.attached.fetch_add(1, Ordering::SeqCst) > 0 {
            self.state.overlapped.store(true, Ordering::SeqCst);
        }

        let released = self.state.clone();
        self.state.delivered.fetch_add(1, Ordering::SeqCst);
        self.notifications.deliver(Notification::new(
            NotificationEvent::new(NotificationKind::DriverReady, 0x0184_2a3b, 1),
            move |_| {
                released.released.fetch_add(1, Ordering::SeqCst);
            },
        ));
        true
    }

    fn remove_driver(&mut self, _device: &DeviceId) -> bool {
        self.state.removed.fetch_add(1, Ordering::SeqCst);
        let behaviour = *self.state.removal.lock().unwrap();
        match behaviour {
            Behaviour::Fail => return false,
            Behaviour::Hang(duration) => std::thread::sleep(duration),
            Behaviour::Succeed => {}
        }
        let _ = self
            .state
            .attached
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        true
    }

    fn stop(self) {
        self.state.stopped.store(true, Ordering::SeqCst);
    }
}

/// Counters kept by [`RecordingLoop`].
#[derive(Default)]
pub struct LoopStats {
    pub started: AtomicUsize,
    pub finished: AtomicUsize,
    pub notifications: AtomicUsize,
}

/// Event loop that drains notifications until quit.
pub struct RecordingLoop {
    pub stats: Arc<LoopStats>,
}

impl RecordingLoop {
    pub fn new() -> (Self, Arc<LoopStats>) {
        let stats = Arc::new(LoopStats::default());
        (Self { stats: stats.clone() }, stats)
    }
}

impl EventLoop for RecordingLoop {
    fn run<'a>(&'a mut self, mut api: SessionApi<'a>) -> impl Future<Output = ()> + Send + 'a {
        async move {
            self.stats.started.fetch_add(1, Ordering::SeqCst);
            while let Some(_notification) = api.next_event().await {
                self.stats.notifications.fetch_add(1, Ordering::SeqCst);
            }
            self.stats.finished.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Event loop that ignores notifications and only waits for quit.
pub struct QuitWaitingLoop {
    pub stats: Arc<LoopStats>,
}

impl QuitWaitingLoop {
    pub fn new() -> (Self, Arc<LoopStats>) {
        let stats = Arc::new(LoopStats::default());
        (Self { stats: stats.clone() }, stats)
    }
}

impl EventLoop for QuitWaitingLoop {
    fn run<'a>(&'a mut self, mut api: SessionApi<'a>) -> impl Future<Output = ()> + Send + 'a {
        async move {
            self.stats.started.fetch_add(1, Ordering::SeqCst);
            api.quit_signalled().await;
            assert!(api.is_quitting());
            self.stats.finished.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Event loop that never returns, not even after quit.
pub struct StuckLoop {
    pub started: Arc<AtomicBool>,
}

impl EventLoop for StuckLoop {
    fn run<'a>(&'a mut self, _api: SessionApi<'a>) -> impl Future<Output = ()> + Send + 'a {
        async move {
            self.started.store(true, Ordering::SeqCst);
            std::future::pending::<()>().await
        }
    }
}

/// A device endpoint backed by a file in a temporary directory.
pub struct FakeDevice {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

impl FakeDevice {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ttyUSB0");
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn plug(&self) {
        std::fs::File::create(&self.path).unwrap();
    }

    pub fn unplug(&self) {
        std::fs::remove_file(&self.path).unwrap();
    }
}

/// Fast-polling configuration pointed at `device`.
pub fn test_config(device: &FakeDevice) -> SupervisorConfig {
    let mut config = SupervisorConfig::default();
    config.device.path = device.path().to_string_lossy().into_owned();
    config.device.poll_interval_ms = 10;
    config.driver.activation_timeout_ms = 1000;
    config.driver.removal_timeout_ms = 1000;
    config.shutdown.grace_period_ms = 2000;
    config
}

/// Tasks currently alive on the test runtime.
pub fn alive_tasks() -> usize {
    tokio::runtime::Handle::current().metrics().num_alive_tasks()
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
