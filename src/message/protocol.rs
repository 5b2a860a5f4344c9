//! # Telemetry Message Types
//!
//! Typed schemas for the MAVLink message kinds the logger understands.
//!
//! Field names follow the MAVLink message definitions so that snapshots read
//! the same as the wire protocol documentation. Enum and bitmask fields are
//! carried as their decoded representation without interpretation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Recognized telemetry message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Heartbeat,
    Attitude,
    Ahrs,
    Ahrs2,
    RawImu,
    ScaledImu2,
    LocalPositionNed,
    GlobalPositionInt,
    BatteryStatus,
    SysStatus,
    Rangefinder,
    DistanceSensor,
    VfrHud,
}

impl MessageKind {
    /// Every recognized kind
    pub const ALL: [MessageKind; 13] = [
        MessageKind::Heartbeat,
        MessageKind::Attitude,
        MessageKind::Ahrs,
        MessageKind::Ahrs2,
        MessageKind::RawImu,
        MessageKind::ScaledImu2,
        MessageKind::LocalPositionNed,
        MessageKind::GlobalPositionInt,
        MessageKind::BatteryStatus,
        MessageKind::SysStatus,
        MessageKind::Rangefinder,
        MessageKind::DistanceSensor,
        MessageKind::VfrHud,
    ];

    /// MAVLink wire name of the kind (e.g. `LOCAL_POSITION_NED`)
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Heartbeat => "HEARTBEAT",
            MessageKind::Attitude => "ATTITUDE",
            MessageKind::Ahrs => "AHRS",
            MessageKind::Ahrs2 => "AHRS2",
            MessageKind::RawImu => "RAW_IMU",
            MessageKind::ScaledImu2 => "SCALED_IMU2",
            MessageKind::LocalPositionNed => "LOCAL_POSITION_NED",
            MessageKind::GlobalPositionInt => "GLOBAL_POSITION_INT",
            MessageKind::BatteryStatus => "BATTERY_STATUS",
            MessageKind::SysStatus => "SYS_STATUS",
            MessageKind::Rangefinder => "RANGEFINDER",
            MessageKind::DistanceSensor => "DISTANCE_SENSOR",
            MessageKind::VfrHud => "VFR_HUD",
        }
    }

    /// Look up a kind by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// File name of the live snapshot for this kind, if the kind is snapshotted
    ///
    /// `VFR_HUD` only feeds the sample log and has no snapshot.
    pub fn snapshot_file(self) -> Option<String> {
        match self {
            MessageKind::VfrHud => None,
            kind => Some(format!("{}.json", kind.name())),
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// HEARTBEAT: vehicle type, autopilot and mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    #[serde(rename = "type", alias = "mavtype", default)]
    pub mavtype: Value,
    #[serde(default)]
    pub autopilot: Value,
    #[serde(default)]
    pub base_mode: Value,
    pub custom_mode: u32,
    #[serde(default)]
    pub system_status: Value,
    pub mavlink_version: u8,
}

/// ATTITUDE: attitude in radians and body rates in rad/s
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub time_boot_ms: u32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub rollspeed: f32,
    pub pitchspeed: f32,
    pub yawspeed: f32,
}

/// AHRS: attitude estimator health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ahrs {
    #[serde(rename = "omegaIx")]
    pub omega_ix: f32,
    #[serde(rename = "omegaIy")]
    pub omega_iy: f32,
    #[serde(rename = "omegaIz")]
    pub omega_iz: f32,
    pub accel_weight: f32,
    pub renorm_val: f32,
    pub error_rp: f32,
    pub error_yaw: f32,
}

/// AHRS2: secondary attitude estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ahrs2 {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub altitude: f32,
    pub lat: i32,
    pub lng: i32,
}

/// RAW_IMU: unscaled accelerometer, gyro and magnetometer readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawImu {
    pub time_usec: u64,
    pub xacc: i16,
    pub yacc: i16,
    pub zacc: i16,
    pub xgyro: i16,
    pub ygyro: i16,
    pub zgyro: i16,
    pub xmag: i16,
    pub ymag: i16,
    pub zmag: i16,
    #[serde(default)]
    pub id: u8,
    #[serde(default)]
    pub temperature: i16,
}

/// SCALED_IMU2: secondary IMU in milli-g, mrad/s and milli-tesla
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledImu2 {
    pub time_boot_ms: u32,
    pub xacc: i16,
    pub yacc: i16,
    pub zacc: i16,
    pub xgyro: i16,
    pub ygyro: i16,
    pub zgyro: i16,
    pub xmag: i16,
    pub ymag: i16,
    pub zmag: i16,
    #[serde(default)]
    pub temperature: i16,
}

/// LOCAL_POSITION_NED: position and velocity in the local NED frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalPositionNed {
    pub time_boot_ms: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
}

/// GLOBAL_POSITION_INT: fused global position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalPositionInt {
    pub time_boot_ms: u32,
    pub lat: i32,
    pub lon: i32,
    pub alt: i32,
    pub relative_alt: i32,
    pub vx: i16,
    pub vy: i16,
    pub vz: i16,
    pub hdg: u16,
}

/// BATTERY_STATUS: per-battery state
///
/// `current_battery` is in centi-amps (-1 when unknown), `current_consumed`
/// in mAh and `battery_remaining` in percent (-1 when unknown). The native
/// `time_remaining` extension is not carried; snapshots derive their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub id: u8,
    #[serde(default)]
    pub battery_function: Value,
    #[serde(rename = "type", alias = "mavtype", default)]
    pub mavtype: Value,
    pub temperature: i16,
    pub voltages: Vec<u16>,
    pub current_battery: i16,
    pub current_consumed: i32,
    pub energy_consumed: i32,
    pub battery_remaining: i8,
    #[serde(default)]
    pub charge_state: Value,
    #[serde(default)]
    pub voltages_ext: Vec<u16>,
    #[serde(default)]
    pub mode: Value,
    #[serde(default)]
    pub fault_bitmask: Value,
}

/// SYS_STATUS: onboard sensor health, battery and link statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SysStatus {
    #[serde(default)]
    pub onboard_control_sensors_present: Value,
    #[serde(default)]
    pub onboard_control_sensors_enabled: Value,
    #[serde(default)]
    pub onboard_control_sensors_health: Value,
    pub load: u16,
    /// Battery voltage in millivolts
    pub voltage_battery: u16,
    pub current_battery: i16,
    pub battery_remaining: i8,
    pub drop_rate_comm: u16,
    pub errors_comm: u16,
    pub errors_count1: u16,
    pub errors_count2: u16,
    pub errors_count3: u16,
    pub errors_count4: u16,
    #[serde(default)]
    pub onboard_control_sensors_present_extended: Value,
    #[serde(default)]
    pub onboard_control_sensors_enabled_extended: Value,
    #[serde(default)]
    pub onboard_control_sensors_health_extended: Value,
}

/// RANGEFINDER: downward rangefinder reading in meters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rangefinder {
    pub distance: f32,
    pub voltage: f32,
}

/// DISTANCE_SENSOR: generic distance sensor reading in centimeters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceSensor {
    pub time_boot_ms: u32,
    pub min_distance: u16,
    pub max_distance: u16,
    pub current_distance: u16,
    #[serde(rename = "type", alias = "mavtype", default)]
    pub mavtype: Value,
    pub id: u8,
    #[serde(default)]
    pub orientation: Value,
    pub covariance: u8,
    #[serde(default)]
    pub horizontal_fov: f32,
    #[serde(default)]
    pub vertical_fov: f32,
    #[serde(default)]
    pub quaternion: Vec<f32>,
    #[serde(default)]
    pub signal_quality: u8,
}

/// VFR_HUD: HUD metrics, including compass heading in degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VfrHud {
    pub airspeed: f32,
    pub groundspeed: f32,
    pub heading: i16,
    pub throttle: u16,
    pub alt: f32,
    pub climb: f32,
}

/// A decoded telemetry message
///
/// Serializes as a flat object tagged with `mavpackettype`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mavpackettype")]
pub enum Message {
    #[serde(rename = "HEARTBEAT")]
    Heartbeat(Heartbeat),
    #[serde(rename = "ATTITUDE")]
    Attitude(Attitude),
    #[serde(rename = "AHRS")]
    Ahrs(Ahrs),
    #[serde(rename = "AHRS2")]
    Ahrs2(Ahrs2),
    #[serde(rename = "RAW_IMU")]
    RawImu(RawImu),
    #[serde(rename = "SCALED_IMU2")]
    ScaledImu2(ScaledImu2),
    #[serde(rename = "LOCAL_POSITION_NED")]
    LocalPositionNed(LocalPositionNed),
    #[serde(rename = "GLOBAL_POSITION_INT")]
    GlobalPositionInt(GlobalPositionInt),
    #[serde(rename = "BATTERY_STATUS")]
    BatteryStatus(BatteryStatus),
    #[serde(rename = "SYS_STATUS")]
    SysStatus(SysStatus),
    #[serde(rename = "RANGEFINDER")]
    Rangefinder(Rangefinder),
    #[serde(rename = "DISTANCE_SENSOR")]
    DistanceSensor(DistanceSensor),
    #[serde(rename = "VFR_HUD")]
    VfrHud(VfrHud),
}

impl Message {
    /// Kind discriminator of this message
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Heartbeat(_) => MessageKind::Heartbeat,
            Message::Attitude(_) => MessageKind::Attitude,
            Message::Ahrs(_) => MessageKind::Ahrs,
            Message::Ahrs2(_) => MessageKind::Ahrs2,
            Message::RawImu(_) => MessageKind::RawImu,
            Message::ScaledImu2(_) => MessageKind::ScaledImu2,
            Message::LocalPositionNed(_) => MessageKind::LocalPositionNed,
            Message::GlobalPositionInt(_) => MessageKind::GlobalPositionInt,
            Message::BatteryStatus(_) => MessageKind::BatteryStatus,
            Message::SysStatus(_) => MessageKind::SysStatus,
            Message::Rangefinder(_) => MessageKind::Rangefinder,
            Message::DistanceSensor(_) => MessageKind::DistanceSensor,
            Message::VfrHud(_) => MessageKind::VfrHud,
        }
    }
}
