//! # Serial Communication Module
//!
//! Handles the MAVLink serial link to the flight controller.
//!
//! This module handles:
//! - Opening the serial connection at the configured baud rate
//! - Decoding MAVLink frames on a dedicated reader thread
//! - Requesting telemetry data streams once the vehicle is heard
//! - Forwarding typed messages to the processing loop

pub mod source;

use mavlink::ardupilotmega::{MavMessage, REQUEST_DATA_STREAM_DATA};
use mavlink::error::MessageReadError;
use mavlink::{MavConnection, MavHeader};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, TelemetryError};
use crate::message::decoder::decode_mavlink;
use crate::message::protocol::Message;
use source::ChannelSource;

/// MAV_DATA_STREAM_ALL
const DATA_STREAM_ALL: u8 = 0;

/// Messages buffered between the reader thread and the processing loop
const CHANNEL_CAPACITY: usize = 1024;

type Connection = Arc<dyn MavConnection<MavMessage> + Send + Sync>;

/// MAVLink serial link handler
///
/// Owns the reader thread that decodes frames off the wire.
pub struct MavlinkSerial {
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
    /// Link speed
    baud_rate: u32,
    /// Background frame reader
    reader: JoinHandle<()>,
}

impl std::fmt::Debug for MavlinkSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MavlinkSerial")
            .field("device_path", &self.device_path)
            .field("baud_rate", &self.baud_rate)
            .finish_non_exhaustive()
    }
}

impl MavlinkSerial {
    /// Open the serial link and start decoding
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyACM0")
    /// * `baud_rate` - Link speed
    /// * `stream_rate_hz` - Rate requested for all telemetry streams
    ///
    /// # Returns
    ///
    /// * `Result<(MavlinkSerial, ChannelSource)>` - Link handle and the message source it feeds
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the port cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fc_telemetry::serial::MavlinkSerial;
    ///
    /// let (link, source) = MavlinkSerial::open("/dev/ttyACM0", 57600, 10)?;
    /// println!("Listening on {}", link.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(path: &str, baud_rate: u32, stream_rate_hz: u16) -> Result<(Self, ChannelSource)> {
        let address = format!("serial:{}:{}", path, baud_rate);
        debug!("Connecting to {}", address);

        let connection: Connection = match mavlink::connect::<MavMessage>(&address) {
            Ok(connection) => Arc::from(connection),
            Err(e) => {
                log_available_ports();
                return Err(TelemetryError::Connection(format!(
                    "Failed to open {}: {}",
                    path, e
                )));
            }
        };
        info!("Opened MAVLink link at {} ({} baud)", path, baud_rate);

        let (tx, source) = ChannelSource::channel(CHANNEL_CAPACITY);
        let reader = std::thread::Builder::new()
            .name("mavlink-reader".to_string())
            .spawn(move || read_frames(connection, tx, stream_rate_hz))?;

        Ok((
            Self {
                device_path: path.to_string(),
                baud_rate,
                reader,
            },
            source,
        ))
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Whether the reader thread is still decoding frames
    pub fn is_reading(&self) -> bool {
        !self.reader.is_finished()
    }
}

/// Decode frames until the link fails or the processing loop goes away
fn read_frames(
    connection: Connection,
    tx: tokio::sync::mpsc::Sender<Message>,
    stream_rate_hz: u16,
) {
    let mut streams_requested = false;

    loop {
        match connection.recv() {
            Ok((header, frame)) => {
                if !streams_requested && matches!(frame, MavMessage::HEARTBEAT(_)) {
                    request_data_streams(connection.as_ref(), &header, stream_rate_hz);
                    streams_requested = true;
                }

                let Some(message) = translate(&frame) else {
                    continue;
                };

                if tx.blocking_send(message).is_err() {
                    debug!("Processing loop closed, stopping MAVLink reader");
                    return;
                }
            }
            Err(MessageReadError::Io(e)) => {
                warn!("MAVLink link read failed: {}", e);
                return;
            }
            Err(e) => {
                // Corrupt or unknown frame
                debug!("Skipping undecodable frame: {}", e);
            }
        }
    }
}

/// Convert a decoded frame, skipping untracked kinds and schema mismatches
fn translate(frame: &MavMessage) -> Option<Message> {
    match decode_mavlink(frame) {
        Ok(message) => message,
        Err(e) => {
            debug!("Skipping malformed message: {}", e);
            None
        }
    }
}

/// Ask the vehicle to stream all telemetry at `rate_hz`
fn request_data_streams(
    connection: &(dyn MavConnection<MavMessage> + Send + Sync),
    vehicle: &MavHeader,
    rate_hz: u16,
) {
    let request = MavMessage::REQUEST_DATA_STREAM(REQUEST_DATA_STREAM_DATA {
        req_message_rate: rate_hz,
        target_system: vehicle.system_id,
        target_component: vehicle.component_id,
        req_stream_id: DATA_STREAM_ALL,
        start_stop: 1,
    });

    match connection.send_default(&request) {
        Ok(_) => info!(
            "Requested all data streams at {}Hz from system {}, component {}",
            rate_hz, vehicle.system_id, vehicle.component_id
        ),
        Err(e) => warn!("Failed to request data streams: {}", e),
    }
}

/// Log the serial ports present on this machine
fn log_available_ports() {
    match tokio_serial::available_ports() {
        Ok(ports) if ports.is_empty() => warn!("No serial ports found"),
        Ok(ports) => {
            for port in ports {
                info!("Available serial port: {}", port.port_name);
            }
        }
        Err(e) => debug!("Could not enumerate serial ports: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::ardupilotmega::{LOCAL_POSITION_NED_DATA, PARAM_VALUE_DATA};

    #[test]
    fn test_constants() {
        assert_eq!(DATA_STREAM_ALL, 0);
        assert!(CHANNEL_CAPACITY >= 64);
    }

    #[test]
    fn test_open_with_invalid_path_returns_error() {
        let result = MavlinkSerial::open("/dev/nonexistent_serial_device_12345", 57600, 10);

        match result {
            Err(TelemetryError::Connection(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Connection error, got: {:?}", other.map(|(link, _)| link)),
        }
    }

    #[test]
    fn test_translate_tracked_kind() {
        let frame = MavMessage::LOCAL_POSITION_NED(LOCAL_POSITION_NED_DATA {
            x: 4.0,
            y: 5.0,
            z: 6.0,
            ..Default::default()
        });

        match translate(&frame) {
            Some(Message::LocalPositionNed(position)) => {
                assert_eq!(position.x, 4.0);
                assert_eq!(position.z, 6.0);
            }
            other => panic!("Expected LOCAL_POSITION_NED, got: {:?}", other),
        }
    }

    #[test]
    fn test_translate_untracked_kind() {
        let frame = MavMessage::PARAM_VALUE(PARAM_VALUE_DATA::default());
        assert!(translate(&frame).is_none());
    }

    // Integration test - only runs if a flight controller is connected
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_heartbeat_with_real_hardware() {
        use source::await_heartbeat;
        use std::time::Duration;

        match MavlinkSerial::open("/dev/ttyACM0", 115200, 10) {
            Ok((link, mut source)) => {
                let result = await_heartbeat(&mut source, Duration::from_secs(5)).await;
                assert!(result.is_ok(), "No heartbeat from {}", link.device_path());
            }
            Err(_) => println!("No flight controller detected (this is OK for CI/CD)"),
        }
    }
}
