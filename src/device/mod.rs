//! Device identity and presence subsystem.
//!
//! # Data Flow
//! ```text
//! DeviceConfig.path
//!     → identity.rs (DeviceId, empty → default endpoint)
//!     → presence.rs (poll filesystem every interval)
//!     → Supervisor waits for "present", session watcher waits for "absent"
//! ```
//!
//! # Design Decisions
//! - Presence is a filesystem stat; only "not found" counts as absent
//! - Waits are plain futures; callers cancel them by dropping (select!)
//! - No upper bound on a wait, shutdown is what bounds it

pub mod identity;
pub mod presence;

pub use identity::{DeviceId, DEFAULT_DEVICE};
pub use presence::PresenceMonitor;
