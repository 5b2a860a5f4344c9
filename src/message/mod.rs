//! # Message Module
//!
//! Typed MAVLink telemetry messages.
//!
//! This module handles:
//! - The closed set of recognized message kinds and their wire names
//! - Fixed per-kind field schemas
//! - Validating decoded field maps at the source boundary

pub mod protocol;
pub mod decoder;

pub use protocol::{Message, MessageKind};
