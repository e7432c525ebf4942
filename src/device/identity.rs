//! Device identity.

use std::path::Path;

/// Endpoint used when no device path is configured.
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

/// Path of the physical device's communication endpoint.
///
/// Constant for the supervisor's lifetime; an empty path maps to
/// [`DEFAULT_DEVICE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        if path.is_empty() {
            Self(DEFAULT_DEVICE.to_string())
        } else {
            Self(path)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self(DEFAULT_DEVICE.to_string())
    }
}

impl From<&str> for DeviceId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for DeviceId {
    fn from(path: &Path) -> Self {
        Self::new(path.to_string_lossy().into_owned())
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
