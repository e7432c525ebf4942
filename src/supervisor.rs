//! Lifecycle supervisor.
//!
//! # Responsibilities
//! - Start the device manager with the configured options
//! - Repeat presence → session → removal cycles until stop
//! - Run the shutdown protocol and report how the process should end
//!
//! # Design Decisions
//! - The cycle loop owns the manager; a new session starts only after the
//!   previous one handed the manager back
//! - Native cleanup (`stop`) runs on the graceful path only, bounded by the
//!   shutdown grace timer; forced paths skip it
//! - `run` returns a [`Termination`]; exiting the process is the caller's job

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::SupervisorConfig;
use crate::device::PresenceMonitor;
use crate::lifecycle::{Shutdown, ShutdownHandle, ShutdownSignal, Termination};
use crate::manager::{DeviceLibrary, DeviceManager, ManagerError, NotificationReceiver, NotificationSender};
use crate::session::{EventLoop, Session};

/// Failures before the supervision loop starts.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Manager(#[from] ManagerError),
}

/// Drives a driver through repeated device insertion/removal cycles.
pub struct Supervisor<D: DeviceLibrary> {
    config: SupervisorConfig,
    library: D,
}

impl<D: DeviceLibrary> Supervisor<D> {
    pub fn new(config: SupervisorConfig, library: D) -> Self {
        Self { config, library }
    }

    /// Run until a termination is decided.
    ///
    /// `signals` carries OS termination signals (see
    /// [`crate::lifecycle::signals::listen`]).
    pub async fn run<L: EventLoop>(
        mut self,
        event_loop: L,
        signals: mpsc::Receiver<ShutdownSignal>,
    ) -> Result<Termination, SupervisorError> {
        let options = self.config.manager.to_options();
        let (notify_tx, notify_rx) = NotificationSender::channel();
        let manager = self.library.start_manager(&options, notify_tx)?;

        let device = self.config.device.identity();
        tracing::info!(
            device = %device,
            options = options.len(),
            "Device manager started"
        );

        let shutdown = Shutdown::new(self.config.shutdown.grace_period());
        let cycles = CycleLoop {
            presence: PresenceMonitor::new(device, self.config.device.poll_interval()),
            config: self.config,
            shutdown: shutdown.subscribe(),
        };

        let task = tokio::spawn(cycles.run(manager, event_loop, notify_rx));
        let abort_cycles = task.abort_handle();

        let panic_watch = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!(error = %e, "Supervision loop panicked");
                    panic_watch.terminate(Termination::SupervisorPanicked);
                }
            }
        });

        let termination = shutdown.run(signals).await;
        abort_cycles.abort();

        match termination.status().code() {
            0 => tracing::info!(%termination, "Supervisor finished"),
            code => tracing::warn!(%termination, exit_code = code, "Supervisor aborted"),
        }
        Ok(termination)
    }
}

struct CycleLoop {
    presence: PresenceMonitor,
    config: SupervisorConfig,
    shutdown: ShutdownHandle,
}

impl CycleLoop {
    async fn run<M, L>(self, mut manager: M, mut event_loop: L, mut notifications: NotificationReceiver)
    where
        M: DeviceManager,
        L: EventLoop,
    {
        loop {
            if self.shutdown.is_stopping() {
                break;
            }

            tracing::info!(device = %self.presence.device(), "Waiting until device is available");
            tokio::select! {
                biased;
                _ = self.shutdown.stopped() => break,
                _ = self.presence.wait_for_state(true) => {}
            }

            let session = Session::new(self.presence.clone(), self.config.driver.clone());
            tracing::info!(session = %session.id(), "Device available, starting session");
            manager = session
                .run(manager, &mut event_loop, &mut notifications, &self.shutdown)
                .await;
        }

        tracing::info!("Stopping device manager");
        let stopped = tokio::task::spawn_blocking(move || manager.stop()).await;
        if let Err(e) = stopped {
            tracing::error!(error = %e, "Device manager stop panicked");
        }

        self.shutdown.terminate(Termination::Completed);
    }
}
