//! # Message Decoder
//!
//! Validates decoded MAVLink field maps against the typed schemas in
//! [`super::protocol`].
//!
//! Kinds the logger does not track decode to `None`. A tracked kind whose
//! fields do not match its schema is a [`TelemetryError::MalformedMessage`].

use mavlink::ardupilotmega::MavMessage;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::protocol::*;
use crate::error::{Result, TelemetryError};

/// Decode a field map tagged with its MAVLink wire name
///
/// # Arguments
///
/// * `kind_name` - MAVLink message name (e.g. "ATTITUDE")
/// * `fields` - JSON object of the message fields
///
/// # Returns
///
/// * `Result<Option<Message>>` - Typed message, `None` for unrecognized kinds
///
/// # Errors
///
/// Returns `MalformedMessage` if the fields do not match the kind's schema
pub fn decode_fields(kind_name: &str, fields: Value) -> Result<Option<Message>> {
    let Some(kind) = MessageKind::from_name(kind_name) else {
        return Ok(None);
    };

    let message = match kind {
        MessageKind::Heartbeat => Message::Heartbeat(parse(kind, fields)?),
        MessageKind::Attitude => Message::Attitude(parse(kind, fields)?),
        MessageKind::Ahrs => Message::Ahrs(parse(kind, fields)?),
        MessageKind::Ahrs2 => Message::Ahrs2(parse(kind, fields)?),
        MessageKind::RawImu => Message::RawImu(parse(kind, fields)?),
        MessageKind::ScaledImu2 => Message::ScaledImu2(parse(kind, fields)?),
        MessageKind::LocalPositionNed => Message::LocalPositionNed(parse(kind, fields)?),
        MessageKind::GlobalPositionInt => Message::GlobalPositionInt(parse(kind, fields)?),
        MessageKind::BatteryStatus => Message::BatteryStatus(parse(kind, fields)?),
        MessageKind::SysStatus => Message::SysStatus(parse(kind, fields)?),
        MessageKind::Rangefinder => Message::Rangefinder(parse(kind, fields)?),
        MessageKind::DistanceSensor => Message::DistanceSensor(parse(kind, fields)?),
        MessageKind::VfrHud => Message::VfrHud(parse(kind, fields)?),
    };

    Ok(Some(message))
}

fn parse<T: DeserializeOwned>(kind: MessageKind, fields: Value) -> Result<T> {
    serde_json::from_value(fields).map_err(|source| TelemetryError::MalformedMessage {
        kind: kind.name(),
        source,
    })
}

/// Decode a message produced by the `mavlink` crate
///
/// Only the payload of recognized kinds is serialized; everything else is
/// dropped without allocation.
pub fn decode_mavlink(message: &MavMessage) -> Result<Option<Message>> {
    macro_rules! payload {
        ($($variant:ident),+ $(,)?) => {
            match message {
                $(MavMessage::$variant(data) => (stringify!($variant), serde_json::to_value(data)?),)+
                _ => return Ok(None),
            }
        };
    }

    let (name, fields) = payload!(
        HEARTBEAT,
        ATTITUDE,
        AHRS,
        AHRS2,
        RAW_IMU,
        SCALED_IMU2,
        LOCAL_POSITION_NED,
        GLOBAL_POSITION_INT,
        BATTERY_STATUS,
        SYS_STATUS,
        RANGEFINDER,
        DISTANCE_SENSOR,
        VFR_HUD,
    );

    decode_fields(name, fields)
}
