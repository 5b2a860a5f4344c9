//! # Sample Gate
//!
//! Decides when the field store holds a sample worth logging.
//!
//! A sample is emitted when the minimum interval has elapsed since the last
//! emission and the anchor fields are present: roll (attitude estimate), x
//! (local position) and heading. Other fields may be absent or older than the
//! anchors; cross-kind staleness up to each kind's own update period is
//! tolerated. Non-anchor fields that were never observed stay empty in the
//! sample.
//!
//! TODO: revisit whether the quorum should require every tracked field once
//! logs from vehicles without a rangefinder have been reviewed.

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

use super::field_store::{Field, FieldStore, FieldValues};

/// Default minimum spacing between samples
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Fields that must be present before any sample is emitted
pub const ANCHOR_FIELDS: [Field; 3] = [Field::Roll, Field::X, Field::Heading];

/// Immutable composite record of the field store at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    values: FieldValues,
}

impl Sample {
    pub fn get(&self, field: Field) -> Option<f64> {
        self.values[field as usize]
    }
}

/// Completeness and cadence gate for samples
#[derive(Debug, Clone)]
pub struct SampleGate {
    min_interval: Duration,
    last_emitted_at: Option<Instant>,
}

impl Default for SampleGate {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL)
    }
}

impl SampleGate {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_emitted_at: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Whether every anchor field is present in `store`
    pub fn is_complete(store: &FieldStore) -> bool {
        ANCHOR_FIELDS.iter().all(|&field| store.is_present(field))
    }

    /// Whether the minimum interval has elapsed at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_emitted_at {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        }
    }

    /// Freeze the store into a sample if it is complete and due
    ///
    /// # Arguments
    ///
    /// * `store` - Current field values
    /// * `now` - Monotonic time used for cadence
    /// * `timestamp` - Wall-clock time recorded in the sample
    pub fn observe(
        &mut self,
        store: &FieldStore,
        now: Instant,
        timestamp: DateTime<Local>,
    ) -> Option<Sample> {
        if !self.is_due(now) || !Self::is_complete(store) {
            return None;
        }

        self.last_emitted_at = Some(now);
        Some(Sample {
            timestamp,
            values: store.values(),
        })
    }
}
