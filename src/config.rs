//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TelemetryError};

/// Baud rates accepted for the flight-controller serial link
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    9600, 19200, 38400, 57600, 115200, 230400, 460800, 500000, 921600, 1500000,
];

/// Main configuration structure
#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub csv: CsvConfig,
    #[serde(default)]
    pub snapshots: SnapshotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,

    #[serde(default = "default_stream_rate_hz")]
    pub stream_rate_hz: u16,
}

/// CSV sample log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CsvConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

/// Live snapshot configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_live_dir")]
    pub live_dir: String,

    #[serde(default = "default_archive_dir")]
    pub archive_dir: String,
}

/// Process logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for a daily-rolling log file; empty logs to stdout only
    #[serde(default)]
    pub file_dir: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 57600 }
fn default_heartbeat_timeout_ms() -> u64 { 5000 }
fn default_stream_rate_hz() -> u16 { 10 }

fn default_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_sample_interval_ms() -> u64 { 500 }

fn default_live_dir() -> String { "public/params".to_string() }
fn default_archive_dir() -> String { "historical_data".to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            stream_rate_hz: default_stream_rate_hz(),
        }
    }
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            log_dir: default_log_dir(),
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            live_dir: default_live_dir(),
            archive_dir: default_archive_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_dir: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fc_telemetry::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a file if it exists, otherwise use defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Connection string understood by the MAVLink transport
    pub fn connection_address(&self) -> String {
        format!("serial:{}:{}", self.serial.port, self.serial.baud_rate)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.serial.heartbeat_timeout_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.csv.sample_interval_ms)
    }

    pub fn live_dir(&self) -> PathBuf {
        PathBuf::from(&self.snapshots.live_dir)
    }

    pub fn archive_dir(&self) -> PathBuf {
        PathBuf::from(&self.snapshots.archive_dir)
    }

    pub fn csv_dir(&self) -> PathBuf {
        PathBuf::from(&self.csv.log_dir)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                SUPPORTED_BAUD_RATES
            )));
        }

        if self.serial.heartbeat_timeout_ms == 0 || self.serial.heartbeat_timeout_ms > 60000 {
            return Err(invalid("heartbeat_timeout_ms must be between 1 and 60000"));
        }

        if self.serial.stream_rate_hz == 0 || self.serial.stream_rate_hz > 100 {
            return Err(invalid("stream_rate_hz must be between 1 and 100"));
        }

        if self.csv.enabled && self.csv.log_dir.is_empty() {
            return Err(invalid("csv log_dir cannot be empty when enabled"));
        }

        if self.csv.sample_interval_ms == 0 || self.csv.sample_interval_ms > 60000 {
            return Err(invalid("sample_interval_ms must be between 1 and 60000"));
        }

        if self.snapshots.enabled {
            if self.snapshots.live_dir.is_empty() {
                return Err(invalid("snapshots live_dir cannot be empty when enabled"));
            }
            if self.snapshots.archive_dir.is_empty() {
                return Err(invalid("snapshots archive_dir cannot be empty when enabled"));
            }
            if Path::new(&self.snapshots.live_dir) == Path::new(&self.snapshots.archive_dir) {
                return Err(invalid("snapshots live_dir and archive_dir must differ"));
            }
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("logging level must be one of: trace, debug, info, warn, error"));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> TelemetryError {
    TelemetryError::Config(toml::de::Error::custom(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyUSB0"
baud_rate = 115200

[csv]
sample_interval_ms = 250

[snapshots]

[logging]
level = "debug"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.sample_interval(), Duration::from_millis(250));
        assert_eq!(config.snapshots.live_dir, "public/params");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.serial.port, default_serial_port());
        assert_eq!(config.serial.baud_rate, 57600);
        assert!(config.csv.enabled);
        assert!(config.snapshots.enabled);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.serial.heartbeat_timeout_ms, 5000);
    }

    #[test]
    fn test_load_invalid_toml() {
        assert!(Config::from_toml("[serial\nport = ").is_err());
    }

    #[test]
    fn test_connection_address() {
        let mut config = create_valid_config();
        config.serial.port = "/dev/ttyUSB1".to_string();
        config.serial.baud_rate = 115200;
        assert_eq!(config.connection_address(), "serial:/dev/ttyUSB1:115200");
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in SUPPORTED_BAUD_RATES {
            let mut config = create_valid_config();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_heartbeat_timeout_bounds() {
        let mut config = create_valid_config();
        config.serial.heartbeat_timeout_ms = 0;
        assert!(config.validate().is_err());
        config.serial.heartbeat_timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stream_rate_bounds() {
        let mut config = create_valid_config();
        config.serial.stream_rate_hz = 0;
        assert!(config.validate().is_err());
        config.serial.stream_rate_hz = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_interval_zero() {
        let mut config = create_valid_config();
        config.csv.sample_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = create_valid_config();
        config.csv.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = create_valid_config();
        config.csv.enabled = false;
        config.csv.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_live_dir_equals_archive_dir() {
        let mut config = create_valid_config();
        config.snapshots.archive_dir = config.snapshots.live_dir.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_live_dir_when_disabled() {
        let mut config = create_valid_config();
        config.snapshots.enabled = false;
        config.snapshots.live_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyACM0");
        assert_eq!(default_baud_rate(), 57600);
        assert_eq!(default_heartbeat_timeout_ms(), 5000);
        assert_eq!(default_stream_rate_hz(), 10);
        assert_eq!(default_log_dir(), "./logs");
        assert_eq!(default_sample_interval_ms(), 500);
        assert_eq!(default_live_dir(), "public/params");
        assert_eq!(default_archive_dir(), "historical_data");
        assert_eq!(default_log_level(), "info");
    }
}
