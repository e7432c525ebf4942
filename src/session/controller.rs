//! Driver session controller.
//!
//! One [`Session`] is one activation-to-removal lifetime of the driver against
//! a present device. It owns the manager for that lifetime and hands it back
//! once the driver has been removed.
//!
//! # Tasks
//! ```text
//! removal watcher : wait for device absent → raise quit(DeviceRemoved)
//! stop forwarder  : wait for stop          → raise quit(Shutdown)
//! removal executor: wait for quit (once) → arm abort timer → remove_driver
//!                   → signal session-quit → wait for event loop → disarm
//! event loop      : application code, concurrently with the executor
//! ```
//! Watcher and forwarder are aborted when the session ends, so nothing
//! polls across cycles.

use std::future::Future;
use std::time::Instant;

use tokio::sync::{oneshot, watch};
use tokio::task::{self, JoinHandle};
use tracing::Instrument;

use crate::config::{ActivationPolicy, DriverConfig};
use crate::device::{DeviceId, PresenceMonitor};
use crate::lifecycle::{AbortTimer, ShutdownHandle, Termination};
use crate::manager::{DeviceManager, NotificationReceiver};
use crate::observability::metrics;
use crate::session::api::{EventLoop, SessionApi, SessionId};
use crate::session::quit::{quit_request, QuitListener, QuitReason, QuitTrigger};

/// Session lifecycle.
///
/// `Inactive → Activating → Running → RemovalRequested → Removing → Removed`,
/// or `Aborted` when removal fails (terminal, the process is going down).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Inactive,
    Activating,
    Running,
    RemovalRequested,
    Removing,
    Removed,
    Aborted,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Inactive => "inactive",
            SessionState::Activating => "activating",
            SessionState::Running => "running",
            SessionState::RemovalRequested => "removal_requested",
            SessionState::Removing => "removing",
            SessionState::Removed => "removed",
            SessionState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Task owned by a session; aborted when dropped.
struct ChildTask(JoinHandle<()>);

impl ChildTask {
    fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(future.in_current_span()))
    }
}

impl Drop for ChildTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// One activation of the driver against a present device.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    device: DeviceId,
    presence: PresenceMonitor,
    driver: DriverConfig,
    state: SessionState,
    activated_at: Option<Instant>,
}

impl Session {
    pub fn new(presence: PresenceMonitor, driver: DriverConfig) -> Self {
        Self {
            id: SessionId::new(),
            device: presence.device().clone(),
            presence,
            driver,
            state: SessionState::Inactive,
            activated_at: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Activate the driver, run `event_loop` and tear down on quit.
    ///
    /// Returns the manager once the driver is removed. If removal fails or
    /// hangs this never returns; the abort timer ends the process instead.
    pub async fn run<M, L>(
        self,
        manager: M,
        event_loop: &mut L,
        notifications: &mut NotificationReceiver,
        shutdown: &ShutdownHandle,
    ) -> M
    where
        M: DeviceManager,
        L: EventLoop,
    {
        let span = tracing::info_span!("session", id = %self.id, device = %self.device);
        self.supervise(manager, event_loop, notifications, shutdown)
            .instrument(span)
            .await
    }

    async fn supervise<M, L>(
        mut self,
        manager: M,
        event_loop: &mut L,
        notifications: &mut NotificationReceiver,
        shutdown: &ShutdownHandle,
    ) -> M
    where
        M: DeviceManager,
        L: EventLoop,
    {
        self.transition(SessionState::Activating);
        let (manager, activated) = self.activate(manager, shutdown).await;
        self.activated_at = Some(Instant::now());
        metrics::record_session_started();

        if !activated {
            match self.driver.on_activation_failure {
                ActivationPolicy::Proceed => {
                    tracing::warn!("Driver activation failed, running event loop anyway");
                }
                ActivationPolicy::SkipCycle => {
                    tracing::warn!("Driver activation failed, skipping cycle until device is removed");
                    tokio::select! {
                        _ = self.presence.wait_for_state(false) => {}
                        _ = shutdown.stopped() => {}
                    }
                    discard_stale(notifications);
                    self.finish();
                    return manager;
                }
            }
        }

        self.transition(SessionState::Running);

        let (trigger, listener) = quit_request();
        let _watcher = ChildTask::spawn(watch_removal(self.presence.clone(), trigger.clone()));
        let _forwarder = ChildTask::spawn(forward_stop(shutdown.clone(), trigger.clone()));

        let (quit_tx, quit_rx) = watch::channel(false);
        let (done_tx, done_rx) = oneshot::channel();
        let api = SessionApi::new(self.id, self.device.clone(), notifications, quit_rx);

        let event_loop_finished = async move {
            event_loop.run(api).await;
            let _ = done_tx.send(());
        };

        let ((), manager) = tokio::join!(
            event_loop_finished,
            self.remove(manager, listener, quit_tx, done_rx, shutdown),
        );

        drop(trigger);
        discard_stale(notifications);
        self.finish();
        manager
    }

    async fn activate<M: DeviceManager>(
        &self,
        mut manager: M,
        shutdown: &ShutdownHandle,
    ) -> (M, bool) {
        let timer = AbortTimer::arm(
            self.driver.activation_timeout(),
            shutdown.clone(),
            Termination::DriverActivationTimeout,
        );

        let device = self.device.clone();
        let outcome = task::spawn_blocking(move || {
            let added = manager.add_driver(&device);
            (manager, added)
        })
        .await;

        match outcome {
            Ok(outcome) => {
                timer.cancel();
                outcome
            }
            Err(e) => {
                tracing::error!(error = %e, "Add-driver call panicked, waiting for abort");
                std::future::pending().await
            }
        }
    }

    async fn remove<M: DeviceManager>(
        &mut self,
        mut manager: M,
        listener: QuitListener,
        session_quit: watch::Sender<bool>,
        loop_done: oneshot::Receiver<()>,
        shutdown: &ShutdownHandle,
    ) -> M {
        let reason = listener.wait().await.unwrap_or(QuitReason::Shutdown);
        tracing::info!(%reason, "Quit requested");
        self.transition(SessionState::RemovalRequested);

        let timer = AbortTimer::arm(
            self.driver.removal_timeout(),
            shutdown.clone(),
            Termination::DriverRemovalTimeout,
        );
        self.transition(SessionState::Removing);

        let device = self.device.clone();
        let outcome = task::spawn_blocking(move || {
            let removed = manager.remove_driver(&device);
            (manager, removed)
        })
        .await;

        match outcome {
            Ok((manager, true)) => {
                let _ = session_quit.send(true);
                let _ = loop_done.await;
                timer.cancel();
                manager
            }
            Ok((_manager, false)) => {
                tracing::error!("Driver removal failed, waiting for abort");
                self.transition(SessionState::Aborted);
                std::future::pending().await
            }
            Err(e) => {
                tracing::error!(error = %e, "Remove-driver call panicked, waiting for abort");
                self.transition(SessionState::Aborted);
                std::future::pending().await
            }
        }
    }

    fn finish(&mut self) {
        self.transition(SessionState::Removed);
        let elapsed = self
            .activated_at
            .map(|at| at.elapsed())
            .unwrap_or_default();
        metrics::record_session_removed(elapsed);
        tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "Session ended");
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = %self.state, to = %next, "Session state changed");
        self.state = next;
    }
}

/// Release whatever the event loop left queued so it cannot reach the next
/// session.
fn discard_stale(notifications: &mut NotificationReceiver) {
    let mut discarded = 0usize;
    while let Ok(stale) = notifications.try_recv() {
        tracing::trace!(notification = %stale, "Discarding stale notification");
        discarded += 1;
    }
    if discarded > 0 {
        tracing::debug!(discarded, "Released notifications left by the event loop");
    }
}

async fn watch_removal(presence: PresenceMonitor, trigger: QuitTrigger) {
    presence.wait_for_state(false).await;
    tracing::info!(device = %presence.device(), "Device removed");
    trigger.raise(QuitReason::DeviceRemoved);
}

async fn forward_stop(shutdown: ShutdownHandle, trigger: QuitTrigger) {
    shutdown.stopped().await;
    trigger.raise(QuitReason::Shutdown);
}
