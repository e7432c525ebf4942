//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → ShutdownSignal channel
//!
//! Shutdown (shutdown.rs):
//!     1st signal → raise stop → arm grace timer
//!     2nd signal → RepeatedSignal
//!     Termination request (graceful or from an abort timer) → return it
//!
//! Abort timers (abort.rs):
//!     armed around every blocking library call
//!     deadline missed → Termination posted to the coordinator
//! ```
//!
//! # Design Decisions
//! - Only the top level exits the process; everything else asks via a handle
//! - Stop is a watch flag, so late subscribers still see it
//! - Termination is bounded: grace period plus removal deadline at most

pub mod abort;
pub mod shutdown;
pub mod signals;

pub use abort::AbortTimer;
pub use shutdown::{ExitStatus, Shutdown, ShutdownHandle, Termination};
pub use signals::ShutdownSignal;
