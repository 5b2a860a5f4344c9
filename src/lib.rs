//! # FC Telemetry Library
//!
//! Log flight-controller MAVLink telemetry to CSV and live JSON snapshots.
//!
//! This library provides the aggregation and sampling engine that turns an
//! interleaved MAVLink message stream into a rate-limited CSV log and a
//! directory of latest-value snapshots archived per session.

pub mod config;
pub mod error;
pub mod message;
pub mod serial;
pub mod telemetry;
