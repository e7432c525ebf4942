//! Per-session quit request.
//!
//! Raised by the removal watcher (device unplugged) and by the stop forwarder
//! (shutdown). Only the first raise is recorded; later raises are no-ops, so
//! concurrent triggers produce exactly one teardown.

use std::sync::Arc;

use tokio::sync::watch;

/// Why a session is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitReason {
    DeviceRemoved,
    Shutdown,
}

impl std::fmt::Display for QuitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuitReason::DeviceRemoved => f.write_str("device removed"),
            QuitReason::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Create a linked trigger/listener pair.
pub fn quit_request() -> (QuitTrigger, QuitListener) {
    let (tx, rx) = watch::channel(None);
    (QuitTrigger { tx: Arc::new(tx) }, QuitListener { rx })
}

/// Raising side; cheap to clone into child tasks.
#[derive(Debug, Clone)]
pub struct QuitTrigger {
    tx: Arc<watch::Sender<Option<QuitReason>>>,
}

impl QuitTrigger {
    /// Record `reason` unless a quit was already raised. Never blocks.
    pub fn raise(&self, reason: QuitReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                false
            } else {
                *current = Some(reason);
                true
            }
        })
    }

    pub fn reason(&self) -> Option<QuitReason> {
        *self.tx.borrow()
    }
}

/// Consuming side; read exactly once per session.
#[derive(Debug)]
pub struct QuitListener {
    rx: watch::Receiver<Option<QuitReason>>,
}

impl QuitListener {
    /// Wait for the first raised reason.
    ///
    /// Returns `None` only if every trigger was dropped without raising.
    pub async fn wait(mut self) -> Option<QuitReason> {
        loop {
            let current = *self.rx.borrow_and_update();
            if current.is_some() {
                return current;
            }
            if self.rx.changed().await.is_err() {
                return None;
            }
        }
    }
}
