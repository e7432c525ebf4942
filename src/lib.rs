//! Driver lifecycle supervisor library.

pub mod config;
pub mod device;
pub mod lifecycle;
pub mod manager;
pub mod observability;
pub mod session;
pub mod supervisor;

pub use config::SupervisorConfig;
pub use lifecycle::{ExitStatus, Shutdown, Termination};
pub use session::{EventLoop, SessionApi};
pub use supervisor::{Supervisor, SupervisorError};
