//! Driver lifecycle supervisor.
//!
//! Keeps a device driver attached to a hot-pluggable device across unplug and
//! replug cycles, and guarantees bounded-time exit on SIGINT/SIGTERM even if
//! the native library hangs.
//!
//! # Architecture Overview
//!
//! ```text
//!        SIGINT/SIGTERM
//!              │
//!              ▼
//!     ┌──────────────────┐  stop   ┌──────────────────────────────────────┐
//!     │     lifecycle    │────────▶│              supervisor              │
//!     │ shutdown + abort │         │  presence ─▶ session ─▶ presence ... │
//!     └──────────────────┘◀────────│              │                       │
//!              │         terminate │              ▼                       │
//!              ▼                   │   activate → event loop → remove     │
//!         exit code                │      (abort timers around each)      │
//!                                  └──────────────────────────────────────┘
//!                                                 │
//!                                                 ▼
//!                                     manager (DeviceLibrary boundary)
//! ```

use std::future::Future;
use std::path::PathBuf;

use clap::Parser;

use driver_supervisor::config::load_or_default;
use driver_supervisor::lifecycle::signals;
use driver_supervisor::manager::LoopbackLibrary;
use driver_supervisor::observability::{logging, metrics};
use driver_supervisor::{EventLoop, SessionApi, Supervisor};

#[derive(Parser)]
#[command(name = "driver-supervisor")]
#[command(about = "Keep a device driver attached across device insertion and removal", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device endpoint to supervise (overrides the config file).
    #[arg(short, long)]
    device: Option<String>,

    /// Log level or filter directive (overrides the config file).
    #[arg(long)]
    log_level: Option<String>,
}

/// Event loop that logs every notification.
struct LoggingEventLoop;

impl EventLoop for LoggingEventLoop {
    fn run<'a>(&'a mut self, mut api: SessionApi<'a>) -> impl Future<Output = ()> + Send + 'a {
        async move {
            tracing::info!(session = %api.session_id(), device = %api.device(), "Event loop started");
            while let Some(notification) = api.next_event().await {
                tracing::info!(%notification, "Notification");
            }
            tracing::info!(session = %api.session_id(), "Event loop finished");
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("driver-supervisor: {}", e);
            std::process::exit(2);
        }
    };
    if let Some(device) = cli.device {
        config.device.path = device;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    logging::init_logging(&config.observability);

    tracing::info!("driver-supervisor v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        device = %config.device.identity(),
        poll_interval_ms = config.device.poll_interval_ms,
        removal_timeout_ms = config.driver.removal_timeout_ms,
        grace_period_ms = config.shutdown.grace_period_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let signals = match signals::listen() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            std::process::exit(1);
        }
    };

    let supervisor = Supervisor::new(config, LoopbackLibrary::new(0x0000_0001));
    let code = match supervisor.run(LoggingEventLoop, signals).await {
        Ok(termination) => termination.status().code(),
        Err(e) => {
            tracing::error!(error = %e, "Supervisor failed to start");
            1
        }
    };

    // Exit here rather than returning: a hung library call on the blocking
    // pool would otherwise keep the runtime from shutting down.
    std::process::exit(code);
}
