//! Injectable per-stage observation
//!
//! Every stage of the pipeline reports through [`PipelineObserver`]. All
//! methods default to no-ops so an observer only implements what it cares
//! about. [`TracingObserver`] is what sessions use unless told otherwise.

use crate::emission::{FinalStatus, StreamEvent};
use crate::error::DeliveryError;
use crate::extractor::ExtractionOutcome;
use crate::repair::RepairRule;
use crate::validator::{Check, ValidationReport};
use parking_lot::Mutex;
use std::sync::Arc;

/// Which scanner ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanRegion {
    Narration,
    Payload,
}

/// Callbacks for each pipeline stage
///
/// `ordinal` is `None` for the end-of-stream validation.
#[allow(unused_variables)]
pub trait PipelineObserver: Send + Sync {
    fn on_chunk(&self, session: &str, index: usize, bytes: usize) {}

    fn on_scan(&self, session: &str, region: ScanRegion, confirmed: usize, pending_from: Option<usize>) {}

    fn on_split(&self, session: &str, offset: usize) {}

    fn on_narration(&self, session: &str, text: &str) {}

    fn on_extraction(&self, session: &str, ordinal: u64, outcome: &ExtractionOutcome) {}

    fn on_validation(&self, session: &str, ordinal: Option<u64>, report: &ValidationReport) {}

    fn on_repair(&self, session: &str, rule: RepairRule, accepted: bool) {}

    fn on_emit(&self, session: &str, event: &StreamEvent) {}

    fn on_suppressed(&self, session: &str, ordinal: u64, reason: &'static str) {}

    fn on_delivery_failure(&self, session: &str, error: &DeliveryError) {}

    fn on_finish(&self, session: &str, status: Option<FinalStatus>) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Logs every stage through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_chunk(&self, session: &str, index: usize, bytes: usize) {
        tracing::trace!(session, index, bytes, "chunk received");
    }

    fn on_scan(&self, session: &str, region: ScanRegion, confirmed: usize, pending_from: Option<usize>) {
        if confirmed > 0 || pending_from.is_some() {
            tracing::trace!(session, ?region, confirmed, ?pending_from, "scan");
        }
    }

    fn on_split(&self, session: &str, offset: usize) {
        tracing::debug!(session, offset, "split delimiter found");
    }

    fn on_narration(&self, session: &str, text: &str) {
        tracing::trace!(session, bytes = text.len(), "narration released");
    }

    fn on_extraction(&self, session: &str, ordinal: u64, outcome: &ExtractionOutcome) {
        match outcome {
            ExtractionOutcome::Candidate(text) => {
                tracing::debug!(session, ordinal, bytes = text.len(), "checkpoint candidate");
            }
            other => {
                tracing::debug!(session, ordinal, outcome = other.name(), "malformed checkpoint");
            }
        }
    }

    fn on_validation(&self, session: &str, ordinal: Option<u64>, report: &ValidationReport) {
        if !report.is_valid() {
            tracing::debug!(session, ?ordinal, issues = ?report.issues(), "candidate rejected");
        }
    }

    fn on_repair(&self, session: &str, rule: RepairRule, accepted: bool) {
        tracing::info!(session, rule = rule.name(), accepted, "final artifact repair");
    }

    fn on_emit(&self, session: &str, event: &StreamEvent) {
        match event {
            StreamEvent::NarrationChunk { .. } => {}
            StreamEvent::Intermediate { ordinal, artifact } => {
                tracing::debug!(session, ordinal, hash = %artifact.hash().short(), "intermediate emitted");
            }
            StreamEvent::Final { status, artifact, .. } => {
                tracing::info!(session, ?status, hash = %artifact.hash().short(), "final emitted");
            }
            StreamEvent::Failed { reason } => {
                tracing::warn!(session, reason = reason.as_str(), "session failed");
            }
        }
    }

    fn on_suppressed(&self, session: &str, ordinal: u64, reason: &'static str) {
        tracing::trace!(session, ordinal, reason, "candidate suppressed");
    }

    fn on_delivery_failure(&self, session: &str, error: &DeliveryError) {
        tracing::warn!(session, %error, "event delivery failed");
    }

    fn on_finish(&self, session: &str, status: Option<FinalStatus>) {
        tracing::debug!(session, ?status, "session finished");
    }
}

/// One recorded stage callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageRecord {
    Chunk { index: usize, bytes: usize },
    Split { offset: usize },
    Narration { text: String },
    Extraction { ordinal: u64, outcome: &'static str },
    Validation { ordinal: Option<u64>, failed: Vec<Check> },
    Repair { rule: RepairRule, accepted: bool },
    Emit { kind: &'static str, ordinal: Option<u64> },
    Suppressed { ordinal: u64, reason: &'static str },
    DeliveryFailure { error: DeliveryError },
    Finish { status: Option<FinalStatus> },
}

/// Collects stage records in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    records: Arc<Mutex<Vec<StageRecord>>>,
}

impl RecordingObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    #[must_use]
    pub fn records(&self) -> Vec<StageRecord> {
        self.records.lock().clone()
    }

    /// Records matching a predicate
    #[must_use]
    pub fn filter(&self, f: impl Fn(&StageRecord) -> bool) -> Vec<StageRecord> {
        self.records.lock().iter().filter(|r| f(r)).cloned().collect()
    }

    fn push(&self, record: StageRecord) {
        self.records.lock().push(record);
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_chunk(&self, _session: &str, index: usize, bytes: usize) {
        self.push(StageRecord::Chunk { index, bytes });
    }

    fn on_split(&self, _session: &str, offset: usize) {
        self.push(StageRecord::Split { offset });
    }

    fn on_narration(&self, _session: &str, text: &str) {
        self.push(StageRecord::Narration { text: text.to_string() });
    }

    fn on_extraction(&self, _session: &str, ordinal: u64, outcome: &ExtractionOutcome) {
        self.push(StageRecord::Extraction {
            ordinal,
            outcome: outcome.name(),
        });
    }

    fn on_validation(&self, _session: &str, ordinal: Option<u64>, report: &ValidationReport) {
        self.push(StageRecord::Validation {
            ordinal,
            failed: report.failed_checks(),
        });
    }

    fn on_repair(&self, _session: &str, rule: RepairRule, accepted: bool) {
        self.push(StageRecord::Repair { rule, accepted });
    }

    fn on_emit(&self, _session: &str, event: &StreamEvent) {
        self.push(StageRecord::Emit {
            kind: event.kind(),
            ordinal: event.ordinal(),
        });
    }

    fn on_suppressed(&self, _session: &str, ordinal: u64, reason: &'static str) {
        self.push(StageRecord::Suppressed { ordinal, reason });
    }

    fn on_delivery_failure(&self, _session: &str, error: &DeliveryError) {
        self.push(StageRecord::DeliveryFailure { error: error.clone() });
    }

    fn on_finish(&self, _session: &str, status: Option<FinalStatus>) {
        self.push(StageRecord::Finish { status });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_observer_shares_records_across_clones() {
        let observer = RecordingObserver::new();
        let shared: Arc<dyn PipelineObserver> = Arc::new(observer.clone());
        shared.on_chunk("s", 0, 3);
        shared.on_split("s", 17);
        shared.on_scan("s", ScanRegion::Payload, 1, None);
        assert_eq!(
            observer.records(),
            vec![
                StageRecord::Chunk { index: 0, bytes: 3 },
                StageRecord::Split { offset: 17 }
            ]
        );
    }

    #[test]
    fn filter_selects_records() {
        let observer = RecordingObserver::new();
        observer.on_suppressed("s", 2, "unchanged");
        observer.on_finish("s", Some(FinalStatus::Validated));
        let finishes = observer.filter(|r| matches!(r, StageRecord::Finish { .. }));
        assert_eq!(finishes.len(), 1);
    }
}
