//! Boundary with the native device manager library.
//!
//! # Data Flow
//! ```text
//! ManagerOptions (configuration phase, immutable once started)
//!     → DeviceLibrary::start_manager
//!     → DeviceManager (single owner, moved into each session)
//!         add_driver / remove_driver  (blocking, run on the blocking pool)
//!         stop                        (graceful path only)
//!     → NotificationSender → event loop → Notification dropped → released
//! ```
//!
//! # Design Decisions
//! - The manager is owned, not shared: a session takes it by value and hands
//!   it back once the driver is removed, so two sessions can never touch it
//! - Calls are synchronous; the supervisor decides where they block
//! - Native resources behind a notification are released on drop

pub mod loopback;
pub mod notification;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::DeviceId;

pub use loopback::LoopbackLibrary;
pub use notification::{
    Notification, NotificationEvent, NotificationKind, NotificationReceiver, NotificationSender,
};

/// Errors raised by the library before the supervision loop starts.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The manager context could not be created.
    #[error("failed to start device manager: {0}")]
    Start(String),

    /// An option was rejected by the library.
    #[error("option '{name}' rejected: {reason}")]
    InvalidOption { name: String, reason: String },
}

/// Value of a named manager option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    Bool(bool),
}

impl std::fmt::Display for OptionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Options applied to the manager before it starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagerOptions {
    config_path: PathBuf,
    user_path: PathBuf,
    overrides: String,
    values: BTreeMap<String, OptionValue>,
}

impl ManagerOptions {
    pub fn new(
        config_path: impl Into<PathBuf>,
        user_path: impl Into<PathBuf>,
        overrides: impl Into<String>,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            user_path: user_path.into(),
            overrides: overrides.into(),
            values: BTreeMap::new(),
        }
    }

    /// Set an integer option. A later call for the same name wins.
    pub fn add_int_option(mut self, name: impl Into<String>, value: i64) -> Self {
        self.values.insert(name.into(), OptionValue::Int(value));
        self
    }

    /// Set a boolean option. A later call for the same name wins.
    pub fn add_bool_option(mut self, name: impl Into<String>, value: bool) -> Self {
        self.values.insert(name.into(), OptionValue::Bool(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn user_path(&self) -> &Path {
        &self.user_path
    }

    pub fn overrides(&self) -> &str {
        &self.overrides
    }
}

/// Entry point of the native library.
pub trait DeviceLibrary: Send + 'static {
    type Manager: DeviceManager;

    /// Create the manager context. Notifications produced by the manager
    /// must be pushed through `notifications`.
    fn start_manager(
        &mut self,
        options: &ManagerOptions,
        notifications: NotificationSender,
    ) -> Result<Self::Manager, ManagerError>;
}

/// A started manager context.
///
/// Every method may block for an unbounded time; the supervisor pairs each
/// call with an abort timer.
pub trait DeviceManager: Send + 'static {
    /// Begin driving `device`. Returns false if the library refused.
    fn add_driver(&mut self, device: &DeviceId) -> bool;

    /// Detach from `device`. Returns true on success.
    fn remove_driver(&mut self, device: &DeviceId) -> bool;

    /// Tear down the manager context.
    fn stop(self);
}
