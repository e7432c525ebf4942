//! Device presence polling.
//!
//! # Responsibilities
//! - Check whether the device endpoint exists
//! - Block (asynchronously) until existence matches a desired state
//!
//! # Design Decisions
//! - "Not found" is the only error that means absent; permission or I/O
//!   errors count as present so a transient failure never looks like an unplug
//! - No lock is held while sleeping between polls

use std::io::ErrorKind;
use std::time::Duration;

use tokio::time;

use crate::device::DeviceId;
use crate::observability::metrics;

/// Polls the filesystem for the device endpoint.
#[derive(Debug, Clone)]
pub struct PresenceMonitor {
    device: DeviceId,
    interval: Duration,
}

impl PresenceMonitor {
    pub fn new(device: DeviceId, interval: Duration) -> Self {
        Self { device, interval }
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Return true if the device endpoint is (conservatively) present.
    pub async fn is_present(&self) -> bool {
        match tokio::fs::metadata(self.device.as_path()).await {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                tracing::debug!(
                    device = %self.device,
                    error = %e,
                    "Presence check failed, treating device as present"
                );
                true
            }
        }
    }

    /// Wait until observed presence equals `desired`.
    ///
    /// Never times out; cancel by dropping the future.
    pub async fn wait_for_state(&self, desired: bool) {
        while self.is_present().await != desired {
            time::sleep(self.interval).await;
        }
        metrics::record_device_presence(desired);
    }
}
