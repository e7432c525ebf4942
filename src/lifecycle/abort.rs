//! Abort timers.
//!
//! A one-shot watchdog paired with a blocking operation that may hang. If it
//! fires it posts its [`Termination`] to the coordinator; that request cannot
//! be withdrawn. Cancelling (or dropping) the timer before the deadline
//! disarms it.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::{ShutdownHandle, Termination};
use crate::observability::metrics;

#[derive(Debug)]
pub struct AbortTimer {
    task: JoinHandle<()>,
    termination: Termination,
}

impl AbortTimer {
    /// Arm a timer that requests `termination` after `deadline`.
    pub fn arm(deadline: Duration, shutdown: ShutdownHandle, termination: Termination) -> Self {
        let task = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            tracing::error!(
                %termination,
                deadline_ms = deadline.as_millis() as u64,
                "Abort timer fired"
            );
            metrics::record_abort(termination.as_str());
            shutdown.terminate(termination);
        });
        Self { task, termination }
    }

    /// Disarm the timer. Has no effect once it has fired.
    pub fn cancel(self) {
        tracing::trace!(termination = %self.termination, "Abort timer cancelled");
    }

    pub fn has_fired(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for AbortTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
