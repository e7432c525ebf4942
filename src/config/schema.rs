//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the supervisor.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::{DeviceId, DEFAULT_DEVICE};
use crate::manager::{ManagerOptions, OptionValue};

/// Root configuration for the driver supervisor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Device identity and presence polling.
    pub device: DeviceConfig,

    /// Driver activation/removal watchdogs and policy.
    pub driver: DriverConfig,

    /// Shutdown escalation settings.
    pub shutdown: ShutdownConfig,

    /// Options applied to the device manager before it starts.
    pub manager: ManagerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Device configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Path of the device endpoint (e.g., "/dev/ttyUSB0"). Empty means default.
    pub path: String,

    /// Presence polling interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl DeviceConfig {
    pub fn identity(&self) -> DeviceId {
        DeviceId::new(self.path.as_str())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DEVICE.to_string(),
            poll_interval_ms: 1000,
        }
    }
}

/// What to do when the library refuses to add the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivationPolicy {
    /// Log and run the event loop anyway.
    #[default]
    Proceed,
    /// Skip the event loop and wait for the device to go away.
    SkipCycle,
}

/// Driver watchdog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Abort deadline for the add-driver call in milliseconds.
    pub activation_timeout_ms: u64,

    /// Abort deadline for driver removal (and event loop exit) in milliseconds.
    pub removal_timeout_ms: u64,

    /// Behaviour after a failed activation.
    pub on_activation_failure: ActivationPolicy,
}

impl DriverConfig {
    pub fn activation_timeout(&self) -> Duration {
        Duration::from_millis(self.activation_timeout_ms)
    }

    pub fn removal_timeout(&self) -> Duration {
        Duration::from_millis(self.removal_timeout_ms)
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            activation_timeout_ms: 5000,
            removal_timeout_ms: 5000,
            on_activation_failure: ActivationPolicy::Proceed,
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time allowed between the first signal and a clean exit, in milliseconds.
    pub grace_period_ms: u64,
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 5000,
        }
    }
}

/// Device manager configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Directory holding the library's device database.
    pub config_path: String,

    /// Writable directory for the library's user data.
    pub user_path: String,

    /// Command-line style option overrides passed through verbatim.
    pub overrides: String,

    /// Named integer/boolean options.
    pub options: BTreeMap<String, OptionValue>,
}

impl ManagerConfig {
    /// Build the options handed to `start_manager`.
    pub fn to_options(&self) -> ManagerOptions {
        let mut options = ManagerOptions::new(&self.config_path, &self.user_path, &self.overrides);
        for (name, value) in &self.options {
            options = match *value {
                OptionValue::Int(v) => options.add_int_option(name, v),
                OptionValue::Bool(v) => options.add_bool_option(name, v),
            };
        }
        options
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            config_path: "/usr/local/etc/openzwave".to_string(),
            user_path: ".".to_string(),
            overrides: String::new(),
            options: BTreeMap::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
