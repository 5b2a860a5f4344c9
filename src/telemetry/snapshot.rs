//! # Snapshot Store
//!
//! Latest full field set of every snapshotted message kind, one JSON file per
//! kind in the live directory.
//!
//! Each update replaces the whole file: the new content is written to a
//! hidden sibling and renamed over the old one, so a reader polling the live
//! directory sees either the previous or the new snapshot. Keys are written
//! in sorted order, making the output a pure function of the message.
//!
//! ## Derived fields
//!
//! `BATTERY_STATUS` snapshots carry `time_remaining` while the battery is
//! discharging (`current_battery > 0`):
//!
//! `time_remaining = floor(battery_remaining / 100 × current_consumed / current_battery)`

use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::trace;

use crate::error::Result;
use crate::message::protocol::{BatteryStatus, Message};

/// Derived field added to battery snapshots
pub const TIME_REMAINING_KEY: &str = "time_remaining";

/// Estimated remaining battery time, or `None` when not discharging
pub fn battery_time_remaining(battery: &BatteryStatus) -> Option<i64> {
    if battery.current_battery <= 0 {
        return None;
    }

    let remaining = f64::from(battery.battery_remaining) / 100.0;
    let ratio = f64::from(battery.current_consumed) / f64::from(battery.current_battery);
    Some((remaining * ratio).floor() as i64)
}

/// Serialized snapshot content for `message`, including derived fields
pub fn snapshot_value(message: &Message) -> Result<Value> {
    let mut value = serde_json::to_value(message)?;

    if let Message::BatteryStatus(battery) = message {
        if let (Some(remaining), Some(fields)) = (battery_time_remaining(battery), value.as_object_mut()) {
            fields.insert(TIME_REMAINING_KEY.to_string(), Value::from(remaining));
        }
    }

    Ok(value)
}

/// Writer of per-kind snapshot files
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    live_dir: PathBuf,
}

impl SnapshotStore {
    /// Create a store writing into `live_dir`, creating it if needed
    pub fn new(live_dir: impl Into<PathBuf>) -> Result<Self> {
        let live_dir = live_dir.into();
        fs::create_dir_all(&live_dir)?;
        Ok(Self { live_dir })
    }

    /// Path of the live snapshot for a file name
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.live_dir.join(file_name)
    }

    /// Replace the snapshot of the message's kind
    ///
    /// # Returns
    ///
    /// * `Result<Option<PathBuf>>` - Path written, or `None` for kinds without a snapshot
    ///
    /// # Errors
    ///
    /// Returns error if serialization or any file operation fails
    pub fn record(&self, message: &Message) -> Result<Option<PathBuf>> {
        let Some(file_name) = message.kind().snapshot_file() else {
            return Ok(None);
        };

        let contents = serde_json::to_vec(&snapshot_value(message)?)?;
        let path = self.path_for(&file_name);
        let staging = self.live_dir.join(format!(".{}.tmp", file_name));

        let mut file = fs::File::create(&staging)?;
        file.write_all(&contents)?;
        drop(file);
        fs::rename(&staging, &path)?;

        trace!("Wrote snapshot {}", path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::protocol::*;
    use serde_json::json;

    fn battery(remaining: i8, consumed: i32, current: i16) -> BatteryStatus {
        BatteryStatus {
            id: 0,
            battery_function: json!("MAV_BATTERY_FUNCTION_ALL"),
            mavtype: json!("MAV_BATTERY_TYPE_LIPO"),
            temperature: 32767,
            voltages: vec![4100, 4100, 4100],
            current_battery: current,
            current_consumed: consumed,
            energy_consumed: -1,
            battery_remaining: remaining,
            charge_state: json!("MAV_BATTERY_CHARGE_STATE_OK"),
            voltages_ext: vec![0; 4],
            mode: json!("MAV_BATTERY_MODE_UNKNOWN"),
            fault_bitmask: Value::Null,
        }
    }

    fn position() -> Message {
        Message::LocalPositionNed(LocalPositionNed {
            time_boot_ms: 1200,
            x: 4.0,
            y: 5.0,
            z: 6.0,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
        })
    }

    #[test]
    fn test_time_remaining_example() {
        assert_eq!(battery_time_remaining(&battery(50, 1000, 500)), Some(1));
    }

    #[test]
    fn test_time_remaining_floors() {
        // 0.75 * 1000 / 400 = 1.875
        assert_eq!(battery_time_remaining(&battery(75, 1000, 400)), Some(1));
        // -0.01 * 100 / 50 = -0.02
        assert_eq!(battery_time_remaining(&battery(-1, 100, 50)), Some(-1));
    }

    #[test]
    fn test_time_remaining_requires_discharge() {
        assert_eq!(battery_time_remaining(&battery(50, 1000, 0)), None);
        assert_eq!(battery_time_remaining(&battery(50, 1000, -1)), None);
    }

    #[test]
    fn test_snapshot_value_battery_derived_field() {
        let value = snapshot_value(&Message::BatteryStatus(battery(50, 1000, 500))).unwrap();
        assert_eq!(value["mavpackettype"], "BATTERY_STATUS");
        assert_eq!(value[TIME_REMAINING_KEY], 1);

        let idle = snapshot_value(&Message::BatteryStatus(battery(50, 1000, 0))).unwrap();
        assert!(idle.get(TIME_REMAINING_KEY).is_none());
        assert_eq!(idle["current_battery"], 0);
    }

    #[test]
    fn test_snapshot_value_keeps_extension_fields() {
        let value = snapshot_value(&Message::BatteryStatus(battery(50, 1000, 500))).unwrap();

        assert_eq!(value["charge_state"], "MAV_BATTERY_CHARGE_STATE_OK");
        assert_eq!(value["mode"], "MAV_BATTERY_MODE_UNKNOWN");
        assert_eq!(value["voltages_ext"].as_array().map(Vec::len), Some(4));
        assert!(value.get("fault_bitmask").is_some());
    }

    #[test]
    fn test_record_writes_kind_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();

        let path = store.record(&position()).unwrap().unwrap();
        assert_eq!(path, dir.path().join("LOCAL_POSITION_NED.json"));

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mavpackettype"], "LOCAL_POSITION_NED");
        assert_eq!(value["x"], 4.0);
        assert_eq!(value["time_boot_ms"], 1200);
    }

    #[test]
    fn test_record_replaces_not_merges() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();

        store.record(&Message::BatteryStatus(battery(50, 1000, 500))).unwrap();
        let path = store
            .record(&Message::BatteryStatus(battery(40, 1000, 0)))
            .unwrap()
            .unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["battery_remaining"], 40);
        assert!(value.get(TIME_REMAINING_KEY).is_none());

        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1, "staging file must not be left behind");
    }

    #[test]
    fn test_record_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        let message = Message::BatteryStatus(battery(50, 1000, 500));

        let path = store.record(&message).unwrap().unwrap();
        let first = fs::read(&path).unwrap();
        store.record(&message).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_record_ignores_unsnapshotted_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();

        let hud = Message::VfrHud(VfrHud {
            airspeed: 0.0,
            groundspeed: 0.0,
            heading: 90,
            throttle: 0,
            alt: 0.0,
            climb: 0.0,
        });

        assert!(store.record(&hud).unwrap().is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_record_fails_when_live_dir_removed() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("live");
        let store = SnapshotStore::new(&live).unwrap();
        fs::remove_dir_all(&live).unwrap();

        assert!(store.record(&position()).is_err());
    }
}
