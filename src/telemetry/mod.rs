//! # Telemetry Module
//!
//! Aggregates the telemetry stream into a sampled CSV log and live per-kind
//! JSON snapshots.
//!
//! This module handles:
//! - Tracking the latest value of each logged quantity
//! - Gating samples on anchor completeness and a minimum interval
//! - Appending samples to a per-run CSV file
//! - Replacing per-kind snapshot files with derived fields
//! - Archiving snapshots into session directories at startup and shutdown

pub mod field_store;
pub mod sample_gate;
pub mod csv_sink;
pub mod snapshot;
pub mod lifecycle;
pub mod engine;

pub use engine::{Engine, EngineStats, StopReason};
