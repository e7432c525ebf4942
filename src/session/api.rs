//! Surface handed to the embedding application's event loop.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::device::DeviceId;
use crate::manager::{Notification, NotificationReceiver};

static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Application code run once per device-presence cycle.
///
/// `run` should return soon after [`SessionApi::next_event`] yields `None`
/// (or [`SessionApi::quit_signalled`] resolves). A loop that keeps running
/// past the removal deadline gets the process aborted.
pub trait EventLoop: Send + 'static {
    fn run<'a>(&'a mut self, api: SessionApi<'a>) -> impl Future<Output = ()> + Send + 'a;
}

/// Per-session view of the driver for the event loop.
pub struct SessionApi<'a> {
    id: SessionId,
    device: DeviceId,
    notifications: &'a mut NotificationReceiver,
    quit: watch::Receiver<bool>,
}

impl<'a> SessionApi<'a> {
    pub(crate) fn new(
        id: SessionId,
        device: DeviceId,
        notifications: &'a mut NotificationReceiver,
        quit: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            device,
            notifications,
            quit,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.id
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn is_quitting(&self) -> bool {
        *self.quit.borrow()
    }

    /// Next notification, or `None` once the driver has been removed.
    ///
    /// Quit takes priority over queued notifications; anything still queued
    /// is released when the session ends.
    pub async fn next_event(&mut self) -> Option<Notification> {
        tokio::select! {
            biased;
            _ = wait_quit(&mut self.quit) => None,
            notification = self.notifications.recv() => notification,
        }
    }

    /// Resolve when the driver has been removed and the loop should return.
    pub async fn quit_signalled(&mut self) {
        wait_quit(&mut self.quit).await
    }

    /// Raw access to the notification queue.
    pub fn notifications(&mut self) -> &mut NotificationReceiver {
        &mut *self.notifications
    }
}

async fn wait_quit(quit: &mut watch::Receiver<bool>) {
    loop {
        let quitting = *quit.borrow_and_update();
        if quitting {
            return;
        }
        if quit.changed().await.is_err() {
            return;
        }
    }
}
