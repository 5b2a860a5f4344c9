//! # Field Store
//!
//! Latest observed value of every tracked telemetry quantity.
//!
//! Each tracked field is sourced from exactly one message kind, so a newer
//! value always replaces the older one regardless of how kinds interleave.
//! Fields stay absent until first observed and are never cleared during a run.
//!
//! | Field | Source |
//! |-------|--------|
//! | roll, pitch, yaw | `AHRS2` |
//! | roll/pitch/yaw rate | `ATTITUDE` rollspeed/pitchspeed/yawspeed |
//! | x, y, z, vx, vy, vz | `LOCAL_POSITION_NED` |
//! | altitude | `RANGEFINDER` distance |
//! | heading | `VFR_HUD` heading |
//! | battery voltage | `SYS_STATUS` voltage_battery (mV → V) |

use crate::message::protocol::Message;

/// Tracked telemetry quantities, in CSV column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Roll,
    Pitch,
    Yaw,
    RollRate,
    PitchRate,
    YawRate,
    X,
    Y,
    Z,
    Vx,
    Vy,
    Vz,
    Altitude,
    Heading,
    BatteryVoltage,
}

impl Field {
    /// Number of tracked fields
    pub const COUNT: usize = 15;

    /// All tracked fields in CSV column order
    pub const ALL: [Field; Field::COUNT] = [
        Field::Roll,
        Field::Pitch,
        Field::Yaw,
        Field::RollRate,
        Field::PitchRate,
        Field::YawRate,
        Field::X,
        Field::Y,
        Field::Z,
        Field::Vx,
        Field::Vy,
        Field::Vz,
        Field::Altitude,
        Field::Heading,
        Field::BatteryVoltage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Roll => "roll",
            Field::Pitch => "pitch",
            Field::Yaw => "yaw",
            Field::RollRate => "omega_x",
            Field::PitchRate => "omega_y",
            Field::YawRate => "omega_z",
            Field::X => "x",
            Field::Y => "y",
            Field::Z => "z",
            Field::Vx => "vx",
            Field::Vy => "vy",
            Field::Vz => "vz",
            Field::Altitude => "altitude",
            Field::Heading => "heading",
            Field::BatteryVoltage => "voltage",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Values of every tracked field; `None` until observed
pub type FieldValues = [Option<f64>; Field::COUNT];

/// Latest-value store, owned by the processing loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldStore {
    values: FieldValues,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the tracked fields carried by `message`
    ///
    /// Kinds that carry no tracked field leave the store untouched.
    pub fn update(&mut self, message: &Message) {
        match message {
            Message::Ahrs2(ahrs2) => {
                self.set(Field::Roll, ahrs2.roll.into());
                self.set(Field::Pitch, ahrs2.pitch.into());
                self.set(Field::Yaw, ahrs2.yaw.into());
            }
            Message::Attitude(attitude) => {
                self.set(Field::RollRate, attitude.rollspeed.into());
                self.set(Field::PitchRate, attitude.pitchspeed.into());
                self.set(Field::YawRate, attitude.yawspeed.into());
            }
            Message::LocalPositionNed(position) => {
                self.set(Field::X, position.x.into());
                self.set(Field::Y, position.y.into());
                self.set(Field::Z, position.z.into());
                self.set(Field::Vx, position.vx.into());
                self.set(Field::Vy, position.vy.into());
                self.set(Field::Vz, position.vz.into());
            }
            Message::Rangefinder(rangefinder) => {
                self.set(Field::Altitude, rangefinder.distance.into());
            }
            Message::VfrHud(hud) => {
                self.set(Field::Heading, hud.heading.into());
            }
            Message::SysStatus(status) => {
                self.set(Field::BatteryVoltage, f64::from(status.voltage_battery) / 1000.0);
            }
            _ => {}
        }
    }

    pub fn set(&mut self, field: Field, value: f64) {
        self.values[field.index()] = Some(value);
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        self.values[field.index()]
    }

    pub fn is_present(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    /// Copy of every value, for freezing into a sample
    pub fn values(&self) -> FieldValues {
        self.values
    }
}
