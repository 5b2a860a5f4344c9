//! # FC Telemetry
//!
//! Log flight-controller telemetry received over a MAVLink serial link.
//!
//! This application samples attitude, position, heading and battery data into
//! a CSV file and keeps per-kind JSON snapshots of the latest messages for
//! live consumers, archiving them into a session directory on exit.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use fc_telemetry::config::Config;
use fc_telemetry::serial::source::await_heartbeat_or_shutdown;
use fc_telemetry::serial::MavlinkSerial;
use fc_telemetry::telemetry::csv_sink::CsvSink;
use fc_telemetry::telemetry::lifecycle::{Lifecycle, SessionGuard};
use fc_telemetry::telemetry::sample_gate::SampleGate;
use fc_telemetry::telemetry::snapshot::SnapshotStore;
use fc_telemetry::telemetry::{Engine, StopReason};

/// File name prefix of the rolling process log
const LOG_FILE_PREFIX: &str = "fc-telemetry.log";

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "fc-telemetry", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Serial device of the flight controller (overrides the config file)
    #[arg(long)]
    connection: Option<String>,

    /// Serial baud rate (overrides the config file)
    #[arg(long)]
    baud: Option<u32>,

    /// Archive the live snapshot directory and exit without connecting
    #[arg(long)]
    cleanup_only: bool,
}

/// Apply command line overrides on top of the loaded configuration
fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(port) = &cli.connection {
        config.serial.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
}

/// Set up stdout logging and the optional daily log file
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// must be held for the life of the process to flush the file writer.
fn init_logging(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.logging.level)
            .with_context(|| format!("invalid log level {:?}", config.logging.level))?,
    };

    let (file_layer, guard) = if config.logging.file_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.logging.file_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// SIGINT and SIGTERM listeners
///
/// Handlers are registered on construction, so a signal that arrives before
/// the first `recv` is held instead of terminating the process.
struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    #[cfg(unix)]
    fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?,
            terminate: signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?,
        })
    }

    #[cfg(not(unix))]
    fn install() -> Result<Self> {
        Ok(Self {})
    }

    /// Resolve once SIGINT or SIGTERM is received
    #[cfg(unix)]
    async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => info!("Received Ctrl+C, shutting down..."),
            _ = self.terminate.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Archive the live snapshot directory and exit
fn cleanup(config: &Config) -> Result<()> {
    let report = Lifecycle::new(config.live_dir(), config.archive_dir()).archive()?;
    info!(
        "Cleanup archived {} snapshots to {}",
        report.archived,
        report.session_dir.display()
    );
    Ok(())
}

/// End the session, archiving its snapshots
fn finish_session(session: Option<SessionGuard>) -> Result<()> {
    if let Some(guard) = session {
        let report = guard.finish()?;
        info!(
            "Archived {} snapshots to {}",
            report.archived,
            report.session_dir.display()
        );
    }
    Ok(())
}

/// Main entry point for FC Telemetry
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration and apply command line overrides
///    - Set up logging
///    - Archive leftovers from a previous run and open a new session
///    - Open the serial link and wait for the first heartbeat
///
/// 2. **Main Loop**
///    - Update the field store and snapshots on every message
///    - Append a CSV row whenever the sample gate opens
///
/// 3. **Graceful Shutdown**
///    - Stop on Ctrl+C, SIGTERM or loss of the link, including while
///      waiting for the first heartbeat
///    - Archive the session's snapshots
///
/// With `--cleanup-only`, the live snapshot directory is archived and the
/// process exits without opening the serial link.
///
/// # Errors
///
/// Returns error if:
/// - The configuration is invalid
/// - The serial port cannot be opened
/// - No heartbeat arrives within the configured timeout
///
/// # Examples
///
/// ```bash
/// fc-telemetry --connection /dev/ttyUSB0 --baud 115200
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    apply_overrides(&cli, &mut config);
    config.validate()?;

    let _log_guard = init_logging(&config)?;
    info!("FC Telemetry v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = if cli.cleanup_only {
        cleanup(&config)
    } else {
        run(&config).await
    };

    if let Err(e) = result {
        error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}

async fn run(config: &Config) -> Result<()> {
    let mut shutdown = ShutdownSignal::install()?;

    let session = if config.snapshots.enabled {
        let lifecycle = Lifecycle::new(config.live_dir(), config.archive_dir());
        let (guard, report) = SessionGuard::start(lifecycle)?;
        if report.archived > 0 {
            info!(
                "Archived {} snapshots left by a previous run to {}",
                report.archived,
                report.session_dir.display()
            );
        }
        Some(guard)
    } else {
        None
    };

    info!("Connecting to {}", config.connection_address());
    let (link, mut source) = MavlinkSerial::open(
        &config.serial.port,
        config.serial.baud_rate,
        config.serial.stream_rate_hz,
    )?;
    let heartbeat =
        await_heartbeat_or_shutdown(&mut source, config.heartbeat_timeout(), shutdown.recv())
            .await?;
    if heartbeat.is_none() {
        return finish_session(session);
    }

    let csv = if config.csv.enabled {
        Some(CsvSink::create(&config.csv_dir(), Local::now())?)
    } else {
        None
    };
    let snapshots = if config.snapshots.enabled {
        Some(SnapshotStore::new(config.live_dir())?)
    } else {
        None
    };

    let mut engine = Engine::new(SampleGate::new(config.sample_interval()), csv, snapshots);
    info!("Logging telemetry from {}", link.device_path());
    info!("Press Ctrl+C to exit");

    let reason = engine.run(&mut source, shutdown.recv()).await;
    if reason == StopReason::SourceClosed && !link.is_reading() {
        warn!("MAVLink link to {} was lost", link.device_path());
    }

    finish_session(session)?;

    let stats = engine.stats();
    info!(
        "Total: {} messages, {} samples, {} snapshots, {} write errors",
        stats.messages, stats.samples, stats.snapshots, stats.write_errors
    );

    Ok(())
}
