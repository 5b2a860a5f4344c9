//! # Error Types
//!
//! Custom error types for FC Telemetry using `thiserror`.

use std::time::Duration;
use thiserror::Error;

/// Main error type for FC Telemetry
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// MAVLink connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// No heartbeat arrived within the bounded wait
    #[error("No heartbeat received within {0:?}")]
    HeartbeatTimeout(Duration),

    /// The message source closed before the expected message arrived
    #[error("Message source closed")]
    SourceClosed,

    /// A decoded field map did not match the schema of its kind
    #[error("Malformed {kind} message: {source}")]
    MalformedMessage {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// CSV log errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Snapshot serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for FC Telemetry
pub type Result<T> = std::result::Result<T, TelemetryError>;
