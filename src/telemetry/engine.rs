//! # Telemetry Engine
//!
//! Single owner of the field store, sample gate and both sinks.
//!
//! Every message updates the field store and, independently of sampling,
//! replaces its kind's snapshot. The sample gate is consulted after each
//! message and any emitted sample is appended to the CSV log. A failed write
//! on either sink is logged and dropped; the loop keeps running.

use chrono::{DateTime, Local};
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::csv_sink::CsvSink;
use super::field_store::FieldStore;
use super::sample_gate::{Sample, SampleGate};
use super::snapshot::SnapshotStore;
use crate::message::protocol::Message;
use crate::serial::source::MessageSource;

/// Number of messages between status log lines
const LOG_INTERVAL_MESSAGES: u64 = 5000;

/// Why the processing loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested (SIGINT/SIGTERM)
    Shutdown,
    /// The message source closed
    SourceClosed,
}

/// Running counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub messages: u64,
    pub samples: u64,
    pub snapshots: u64,
    pub write_errors: u64,
}

/// Telemetry aggregation and sampling engine
#[derive(Debug)]
pub struct Engine {
    store: FieldStore,
    gate: SampleGate,
    csv: Option<CsvSink>,
    snapshots: Option<SnapshotStore>,
    stats: EngineStats,
}

impl Engine {
    /// Create an engine; either sink may be disabled with `None`
    pub fn new(gate: SampleGate, csv: Option<CsvSink>, snapshots: Option<SnapshotStore>) -> Self {
        Self {
            store: FieldStore::new(),
            gate,
            csv,
            snapshots,
            stats: EngineStats::default(),
        }
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Process one message at the current time
    pub fn handle(&mut self, message: &Message) -> Option<Sample> {
        self.handle_at(message, Instant::now(), Local::now())
    }

    /// Process one message at the given time
    ///
    /// # Returns
    ///
    /// * `Option<Sample>` - The sample emitted by this message, if any
    pub fn handle_at(
        &mut self,
        message: &Message,
        now: Instant,
        timestamp: DateTime<Local>,
    ) -> Option<Sample> {
        self.stats.messages += 1;
        self.store.update(message);

        if self.stats.messages % LOG_INTERVAL_MESSAGES == 0 {
            info!(
                "Processed {} messages, {} samples, {} snapshots",
                self.stats.messages, self.stats.samples, self.stats.snapshots
            );
        }

        if let Some(snapshots) = &self.snapshots {
            match snapshots.record(message) {
                Ok(Some(_)) => self.stats.snapshots += 1,
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to write {} snapshot: {}", message.kind(), e);
                    self.stats.write_errors += 1;
                }
            }
        }

        let csv = self.csv.as_mut()?;
        let sample = self.gate.observe(&self.store, now, timestamp)?;
        match csv.append(&sample) {
            Ok(()) => self.stats.samples += 1,
            Err(e) => {
                warn!("Failed to append sample to {}: {}", csv.path().display(), e);
                self.stats.write_errors += 1;
            }
        }

        Some(sample)
    }

    /// Process messages until `shutdown` resolves or the source closes
    ///
    /// After each blocking receive, messages already pending are drained
    /// without waiting before shutdown is checked again.
    pub async fn run<S, F>(&mut self, source: &mut S, shutdown: F) -> StopReason
    where
        S: MessageSource + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested after {} messages", self.stats.messages);
                    return StopReason::Shutdown;
                }

                next = source.recv() => match next {
                    Some(message) => {
                        self.handle(&message);
                        while let Some(pending) = source.try_recv() {
                            self.handle(&pending);
                        }
                    }
                    None => {
                        debug!("Message source closed");
                        return StopReason::SourceClosed;
                    }
                },
            }
        }
    }
}
