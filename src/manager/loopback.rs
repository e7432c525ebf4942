//! In-process stand-in for the native device manager.
//!
//! Used by the binary when no native backend is linked. Activation emits
//! `DriverReady` followed by `NodeAdded` for the controller node; removal
//! emits `DriverRemoved`. Outstanding (unreleased) notifications are counted
//! so leaks show up in logs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::device::DeviceId;
use crate::manager::{
    DeviceLibrary, DeviceManager, ManagerError, ManagerOptions, Notification, NotificationEvent,
    NotificationKind, NotificationSender,
};

const CONTROLLER_NODE: u8 = 1;

/// Library handle for the loopback manager.
#[derive(Debug, Default)]
pub struct LoopbackLibrary {
    home_id: u32,
}

impl LoopbackLibrary {
    pub fn new(home_id: u32) -> Self {
        Self { home_id }
    }
}

impl DeviceLibrary for LoopbackLibrary {
    type Manager = LoopbackManager;

    fn start_manager(
        &mut self,
        options: &ManagerOptions,
        notifications: NotificationSender,
    ) -> Result<LoopbackManager, ManagerError> {
        for (name, value) in options.iter() {
            if name.is_empty() {
                return Err(ManagerError::InvalidOption {
                    name: name.to_string(),
                    reason: "empty name".to_string(),
                });
            }
            tracing::debug!(option = name, value = %value, "Applying manager option");
        }

        tracing::info!(
            config_path = %options.config_path().display(),
            user_path = %options.user_path().display(),
            options = options.len(),
            "Loopback manager started"
        );

        Ok(LoopbackManager {
            home_id: self.home_id,
            notifications,
            outstanding: Arc::new(AtomicU64::new(0)),
        })
    }
}

/// Manager context of the loopback library.
#[derive(Debug)]
pub struct LoopbackManager {
    home_id: u32,
    notifications: NotificationSender,
    outstanding: Arc<AtomicU64>,
}

impl LoopbackManager {
    /// Notifications delivered but not yet released.
    pub fn outstanding(&self) -> u64 {
        self.outstanding.load(Ordering::SeqCst)
    }

    fn emit(&self, kind: NotificationKind) {
        let outstanding = self.outstanding.clone();
        outstanding.fetch_add(1, Ordering::SeqCst);
        let notification = Notification::new(
            NotificationEvent::new(kind, self.home_id, CONTROLLER_NODE),
            move |_| {
                outstanding.fetch_sub(1, Ordering::SeqCst);
            },
        );
        self.notifications.deliver(notification);
    }
}

impl DeviceManager for LoopbackManager {
    fn add_driver(&mut self, device: &DeviceId) -> bool {
        tracing::debug!(device = %device, "Loopback driver added");
        self.emit(NotificationKind::DriverReady);
        self.emit(NotificationKind::NodeAdded);
        true
    }

    fn remove_driver(&mut self, device: &DeviceId) -> bool {
        tracing::debug!(device = %device, "Loopback driver removed");
        self.emit(NotificationKind::DriverRemoved);
        true
    }

    fn stop(self) {
        tracing::info!(
            outstanding = self.outstanding(),
            "Loopback manager stopped"
        );
    }
}
