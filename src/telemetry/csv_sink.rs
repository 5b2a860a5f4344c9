//! # CSV Sink
//!
//! Append-only CSV log of samples, one file per run.
//!
//! The file is created once at startup as `cube_log_YYYYMMDD_HHMMSS.csv` and
//! flushed after every row, so an abrupt stop loses at most the row in flight.

use chrono::{DateTime, Local};
use csv::Writer;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use super::field_store::Field;
use super::sample_gate::Sample;
use crate::error::Result;

/// Column header, in row order
pub const HEADER: [&str; 16] = [
    "Timestamp",
    "Roll (deg)",
    "Pitch (deg)",
    "Yaw (deg)",
    "Omega X (deg/s)",
    "Omega Y (deg/s)",
    "Omega Z (deg/s)",
    "Position X (m)",
    "Position Y (m)",
    "Position Z (m)",
    "Velocity X (m/s)",
    "Velocity Y (m/s)",
    "Velocity Z (m/s)",
    "Altitude (m)",
    "Heading (deg)",
    "Battery Voltage (V)",
];

/// Row timestamp format (local time)
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Decimal places per field; `None` writes the value unrounded
fn precision(field: Field) -> Option<usize> {
    match field {
        Field::Roll | Field::Pitch | Field::Yaw => Some(3),
        Field::RollRate | Field::PitchRate | Field::YawRate => Some(3),
        Field::X | Field::Y | Field::Z => Some(4),
        Field::Vx => Some(4),
        Field::Vy | Field::Vz => Some(3),
        Field::Altitude => Some(4),
        Field::Heading | Field::BatteryVoltage => None,
    }
}

fn format_value(field: Field, value: Option<f64>) -> String {
    match (value, precision(field)) {
        (None, _) => String::new(),
        (Some(v), Some(places)) => format!("{:.*}", places, v),
        (Some(v), None) => v.to_string(),
    }
}

/// Format a sample as a CSV row matching [`HEADER`]
pub fn format_row(sample: &Sample) -> Vec<String> {
    let mut row = Vec::with_capacity(HEADER.len());
    row.push(sample.timestamp.format(TIMESTAMP_FORMAT).to_string());
    row.extend(Field::ALL.iter().map(|&field| format_value(field, sample.get(field))));
    row
}

/// CSV log file for one run
pub struct CsvSink {
    writer: Writer<Box<dyn Write + Send>>,
    path: PathBuf,
    rows: u64,
}

impl std::fmt::Debug for CsvSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSink")
            .field("path", &self.path)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

impl CsvSink {
    /// Create the run's log file in `dir` and write the header
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created
    pub fn create(dir: &Path, started_at: DateTime<Local>) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("cube_log_{}.csv", started_at.format("%Y%m%d_%H%M%S")));

        let sink = Self::from_writer(File::create(&path)?, path)?;

        info!("Logging samples to {}", sink.path.display());
        Ok(sink)
    }

    /// Start a log on any writer and write the header
    ///
    /// `path` names the destination in log messages only.
    pub fn from_writer<W>(writer: W, path: impl Into<PathBuf>) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let boxed: Box<dyn Write + Send> = Box::new(writer);
        let mut writer = Writer::from_writer(boxed);
        writer.write_record(HEADER)?;
        writer.flush()?;

        Ok(Self {
            writer,
            path: path.into(),
            rows: 0,
        })
    }

    /// Append one sample and flush it to disk
    pub fn append(&mut self, sample: &Sample) -> Result<()> {
        self.writer.write_record(format_row(sample))?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written so far, excluding the header
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::field_store::FieldStore;
    use crate::telemetry::sample_gate::SampleGate;
    use chrono::TimeZone;
    use std::time::Instant;

    fn started_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 17, 14, 3, 9).unwrap()
    }

    fn full_sample() -> Sample {
        let mut store = FieldStore::new();
        let values = [
            1.23456, -2.5, 3.0, 0.1111, 0.2222, 0.3333, 4.56789, 5.0, -6.00004, 0.123456, 0.98765,
            -0.5, 12.34567, 270.0, 12.6,
        ];
        for (field, value) in Field::ALL.iter().zip(values) {
            store.set(*field, value);
        }

        SampleGate::default()
            .observe(&store, Instant::now(), started_at())
            .unwrap()
    }

    #[test]
    fn test_header_has_sixteen_columns() {
        assert_eq!(HEADER.len(), 16);
        assert_eq!(HEADER.len(), Field::COUNT + 1);
        assert_eq!(HEADER[0], "Timestamp");
        assert_eq!(HEADER[15], "Battery Voltage (V)");
    }

    #[test]
    fn test_format_row_rounding() {
        let row = format_row(&full_sample());

        assert_eq!(row.len(), 16);
        assert_eq!(row[0], "2024-05-17 14:03:09");
        assert_eq!(row[1], "1.235");
        assert_eq!(row[2], "-2.500");
        assert_eq!(row[4], "0.111");
        assert_eq!(row[7], "4.5679");
        assert_eq!(row[9], "-6.0000");
        assert_eq!(row[10], "0.1235");
        assert_eq!(row[11], "0.988");
        assert_eq!(row[13], "12.3457");
        assert_eq!(row[14], "270");
        assert_eq!(row[15], "12.6");
    }

    #[test]
    fn test_format_row_absent_fields_are_empty() {
        let mut store = FieldStore::new();
        store.set(Field::Roll, 1.0);
        store.set(Field::X, 4.0);
        store.set(Field::Heading, 7.0);
        let sample = SampleGate::default()
            .observe(&store, Instant::now(), started_at())
            .unwrap();

        let row = format_row(&sample);
        assert_eq!(row.len(), 16);
        assert_eq!(row[1], "1.000");
        assert_eq!(row[13], "");
        assert_eq!(row[15], "");
    }

    #[test]
    fn test_create_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::create(dir.path(), started_at()).unwrap();

        assert_eq!(
            sink.path().file_name().unwrap().to_str().unwrap(),
            "cube_log_20240517_140309.csv"
        );
        let contents = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(contents.lines().next().unwrap(), HEADER.join(","));
        assert_eq!(sink.rows(), 0);
    }

    #[test]
    fn test_append_flushes_each_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::create(&dir.path().join("nested"), started_at()).unwrap();

        sink.append(&full_sample()).unwrap();
        // Readable without dropping the writer
        let contents = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(contents.lines().count(), 2);

        sink.append(&full_sample()).unwrap();
        assert_eq!(sink.rows(), 2);

        let mut reader = csv::Reader::from_path(sink.path()).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 16);
        for record in reader.records() {
            let record = record.unwrap();
            assert_eq!(record.len(), 16);
            assert_eq!(&record[1], "1.235");
        }
    }

    #[test]
    fn test_from_writer_reports_write_failure() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let result = CsvSink::from_writer(Broken, "broken.csv");
        assert!(result.is_err());
    }
}
