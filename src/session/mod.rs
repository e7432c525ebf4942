//! Driver session subsystem.
//!
//! # Data Flow
//! ```text
//! device present
//!     → controller.rs: Session::run takes the manager
//!         activate (abort-timer guarded)
//!         quit.rs: watcher + stop forwarder raise one QuitRequest
//!         api.rs: EventLoop runs with a SessionApi
//!         removal executor tears down (abort-timer guarded)
//!     → manager handed back to the supervisor
//! ```
//!
//! # Design Decisions
//! - Exactly one read of the quit request per session; double teardown is
//!   impossible by construction
//! - A failed or hung removal is not retried; the abort timer ends the process
//! - Child tasks die with their session

pub mod api;
pub mod controller;
pub mod quit;

pub use api::{EventLoop, SessionApi, SessionId};
pub use controller::{Session, SessionState};
pub use quit::{quit_request, QuitListener, QuitReason, QuitTrigger};
