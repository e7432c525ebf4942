//! Shutdown coordination for the supervisor.
//!
//! # Protocol
//! ```text
//! first signal   → stop raised (sessions quit, presence loop stops)
//!                → grace timer armed (ShutdownTimeout if it fires)
//! second signal  → RepeatedSignal, immediately
//! termination    → whichever request arrives first ends `run`
//! ```
//!
//! Lower-level tasks never exit the process. They post a [`Termination`]
//! through a [`ShutdownHandle`] and the coordinator returns it to the caller.

use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::lifecycle::abort::AbortTimer;
use crate::lifecycle::signals::ShutdownSignal;

/// Process-level outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Graceful,
    Forced,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Graceful => 0,
            ExitStatus::Forced => 1,
        }
    }
}

/// Why the supervisor ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Stop requested and every session was removed cleanly.
    Completed,
    /// A second signal arrived during graceful shutdown.
    RepeatedSignal,
    /// Graceful shutdown did not finish within the grace period.
    ShutdownTimeout,
    /// Driver removal (or event loop exit) missed its deadline or failed.
    DriverRemovalTimeout,
    /// The add-driver call missed its deadline.
    DriverActivationTimeout,
    /// The supervision loop panicked.
    SupervisorPanicked,
}

impl Termination {
    pub fn status(self) -> ExitStatus {
        match self {
            Termination::Completed => ExitStatus::Graceful,
            _ => ExitStatus::Forced,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Completed => "completed",
            Termination::RepeatedSignal => "repeated_signal",
            Termination::ShutdownTimeout => "shutdown_timeout",
            Termination::DriverRemovalTimeout => "driver_removal_timeout",
            Termination::DriverActivationTimeout => "driver_activation_timeout",
            Termination::SupervisorPanicked => "supervisor_panicked",
        }
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinator for graceful shutdown.
///
/// Owns the stop flag that all long-running tasks observe and the queue of
/// termination requests.
pub struct Shutdown {
    stop_tx: watch::Sender<bool>,
    term_tx: mpsc::UnboundedSender<Termination>,
    term_rx: mpsc::UnboundedReceiver<Termination>,
    grace_period: Duration,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new(grace_period: Duration) -> Self {
        let (stop_tx, _) = watch::channel(false);
        let (term_tx, term_rx) = mpsc::unbounded_channel();
        Self {
            stop_tx,
            term_tx,
            term_rx,
            grace_period,
        }
    }

    /// Get a handle for a task that must observe stop or request termination.
    pub fn subscribe(&self) -> ShutdownHandle {
        ShutdownHandle {
            stop_rx: self.stop_tx.subscribe(),
            term_tx: self.term_tx.clone(),
        }
    }

    /// Raise the stop flag. Returns false if it was already raised.
    pub fn trigger(&self) -> bool {
        self.stop_tx.send_if_modified(|stopping| {
            if *stopping {
                false
            } else {
                *stopping = true;
                true
            }
        })
    }

    pub fn is_stopping(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Drive the signal protocol until a termination is decided.
    pub async fn run(mut self, mut signals: mpsc::Receiver<ShutdownSignal>) -> Termination {
        let mut signals_open = true;

        let first = loop {
            tokio::select! {
                termination = self.next_termination() => return termination,
                signal = signals.recv(), if signals_open => match signal {
                    Some(signal) => break signal,
                    None => signals_open = false,
                },
            }
        };

        tracing::info!(signal = %first, "Received signal, commencing shutdown");
        self.trigger();

        let _grace = AbortTimer::arm(
            self.grace_period,
            self.subscribe(),
            Termination::ShutdownTimeout,
        );

        loop {
            tokio::select! {
                termination = self.next_termination() => return termination,
                signal = signals.recv(), if signals_open => match signal {
                    Some(signal) => {
                        tracing::warn!(signal = %signal, "Received second signal, aborting now");
                        return Termination::RepeatedSignal;
                    }
                    None => signals_open = false,
                },
            }
        }
    }

    async fn next_termination(&mut self) -> Termination {
        // term_tx lives in self, so the queue cannot close while we wait
        self.term_rx
            .recv()
            .await
            .unwrap_or(Termination::SupervisorPanicked)
    }
}

/// Per-task view of the coordinator.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    stop_rx: watch::Receiver<bool>,
    term_tx: mpsc::UnboundedSender<Termination>,
}

impl ShutdownHandle {
    pub fn is_stopping(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Resolve once stop has been raised (or the coordinator is gone).
    pub async fn stopped(&self) {
        let mut rx = self.stop_rx.clone();
        loop {
            let stopping = *rx.borrow_and_update();
            if stopping {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Ask the coordinator to end the process.
    pub fn terminate(&self, termination: Termination) {
        if self.term_tx.send(termination).is_err() {
            tracing::debug!(%termination, "Termination requested after coordinator finished");
        }
    }
}
