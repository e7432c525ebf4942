//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SupervisorConfig (validated, immutable)
//!     → CLI overrides applied once in main
//!     → handed by value to the Supervisor
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the device identity is fixed for the
//!   lifetime of the process, so there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::ActivationPolicy;
pub use schema::DeviceConfig;
pub use schema::DriverConfig;
pub use schema::ManagerConfig;
pub use schema::ObservabilityConfig;
pub use schema::ShutdownConfig;
pub use schema::SupervisorConfig;
