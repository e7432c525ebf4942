//! Notifications produced by the device manager.
//!
//! A [`Notification`] owns whatever native resource backs it. The release
//! hook runs exactly once, when the value is dropped, whether the consumer
//! processed it or delivery failed.

use tokio::sync::mpsc;

use crate::observability::metrics;

/// Kind of event reported by the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    ValueAdded,
    ValueRemoved,
    ValueChanged,
    NodeAdded,
    NodeRemoved,
    DriverReady,
    DriverFailed,
    DriverReset,
    DriverRemoved,
    AllNodesQueried,
    Other(u8),
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ValueAdded => "ValueAdded",
            NotificationKind::ValueRemoved => "ValueRemoved",
            NotificationKind::ValueChanged => "ValueChanged",
            NotificationKind::NodeAdded => "NodeAdded",
            NotificationKind::NodeRemoved => "NodeRemoved",
            NotificationKind::DriverReady => "DriverReady",
            NotificationKind::DriverFailed => "DriverFailed",
            NotificationKind::DriverReset => "DriverReset",
            NotificationKind::DriverRemoved => "DriverRemoved",
            NotificationKind::AllNodesQueried => "AllNodesQueried",
            NotificationKind::Other(_) => "Other",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Other(raw) => write!(f, "Other({})", raw),
            kind => f.write_str(kind.as_str()),
        }
    }
}

/// Plain data copied out of a native notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub code: u8,
    pub home_id: u32,
    pub node_id: u8,
    pub value_type: u8,
    pub value_id: u64,
}

impl NotificationEvent {
    pub fn new(kind: NotificationKind, home_id: u32, node_id: u8) -> Self {
        Self {
            kind,
            code: 0,
            home_id,
            node_id,
            value_type: 0,
            value_id: 0,
        }
    }
}

type ReleaseHook = Box<dyn FnOnce(&NotificationEvent) + Send>;

/// An event from the manager together with its release obligation.
pub struct Notification {
    event: NotificationEvent,
    release: Option<ReleaseHook>,
}

impl Notification {
    /// Wrap an event whose backing resource is freed by `release`.
    pub fn new<F>(event: NotificationEvent, release: F) -> Self
    where
        F: FnOnce(&NotificationEvent) + Send + 'static,
    {
        Self {
            event,
            release: Some(Box::new(release)),
        }
    }

    /// Wrap an event with nothing to release.
    pub fn unmanaged(event: NotificationEvent) -> Self {
        Self {
            event,
            release: None,
        }
    }

    pub fn event(&self) -> &NotificationEvent {
        &self.event
    }

    pub fn kind(&self) -> NotificationKind {
        self.event.kind
    }
}

impl Drop for Notification {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(&self.event);
        }
    }
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("event", &self.event)
            .field("managed", &self.release.is_some())
            .finish()
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let e = &self.event;
        write!(
            f,
            "Notification[notificationType={}, notificationCode={}, homeId=0x{:08x}, nodeId=0x{:02x}, valueType={}, valueId=0x{:08x}]",
            e.kind, e.code, e.home_id, e.node_id, e.value_type, e.value_id
        )
    }
}

/// Receiving half handed to the event loop.
pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Producer side given to the manager.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationSender {
    pub fn channel() -> (Self, NotificationReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a notification for the event loop.
    ///
    /// Returns false if the consumer is gone; the notification is released.
    pub fn deliver(&self, notification: Notification) -> bool {
        let kind = notification.kind();
        match self.tx.send(notification) {
            Ok(()) => {
                metrics::record_notification(kind.as_str());
                true
            }
            Err(_) => {
                tracing::debug!(kind = %kind, "Notification dropped, no consumer");
                false
            }
        }
    }
}
