//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGINT and SIGTERM (ctrl-c off unix)
//! - Translate them into [`ShutdownSignal`] values on a bounded channel
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Signals arriving while the channel is full are coalesced, not queued
//! - The coordinator reads the channel, so tests can inject signals directly

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Capacity of the signal channel; the protocol only cares about two.
const SIGNAL_BUFFER: usize = 2;

/// A termination request from the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Interrupt => f.write_str("SIGINT"),
            ShutdownSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Install the handlers and return the stream of received signals.
///
/// Must be called from within a Tokio runtime.
pub fn listen() -> std::io::Result<mpsc::Receiver<ShutdownSignal>> {
    let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    Some(()) = interrupt.recv() => ShutdownSignal::Interrupt,
                    Some(()) = terminate.recv() => ShutdownSignal::Terminate,
                    else => break,
                };
                if !forward(&tx, received) {
                    break;
                }
            }
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !forward(&tx, ShutdownSignal::Interrupt) {
                    break;
                }
            }
        });
    }

    Ok(rx)
}

/// Returns false once nobody is listening.
fn forward(tx: &mpsc::Sender<ShutdownSignal>, signal: ShutdownSignal) -> bool {
    match tx.try_send(signal) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::debug!(%signal, "Signal coalesced");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}
