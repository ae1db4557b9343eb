//! One generation session
//!
//! A [`GenerationSession`] owns the buffer and every derived structure for a
//! single generator stream. Chunks are processed strictly in order; each
//! call runs the full scan, split, extract, validate and emit cycle before
//! returning.
//!
//! # Chunk-boundary invariance
//!
//! Narration is released line by line, and only once the line lies before
//! the scanner's pending tail. Checkpoints are derived from confirmed
//! delimiter occurrences only. Neither depends on where chunk boundaries
//! fall, so the emitted sequence is a function of the complete text alone.

use crate::buffer::StreamBuffer;
use crate::config::{SessionConfig, SessionPlan};
use crate::emission::{Completion, EmissionController, FinalStatus, Offer, StreamEvent};
use crate::error::ConfigError;
use crate::extractor::{ExtractionOutcome, FinalMode};
use crate::observer::{PipelineObserver, ScanRegion, TracingObserver};
use crate::scanner::IncrementalScanner;
use crate::validator::ValidationReport;
use std::sync::Arc;
use tastegen_artifact::{ContentHash, GeneratedArtifact};

/// Memoizes validation verdicts by content hash
///
/// Implementations must be scoped to one session.
pub trait VerdictMemo: Send + Sync {
    fn get(&self, hash: &ContentHash) -> Option<ValidationReport>;

    fn put(&self, hash: ContentHash, report: ValidationReport);
}

/// A processed checkpoint announcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub ordinal: u64,
    pub outcome: ExtractionOutcome,
    /// `None` when there was no candidate to validate
    pub report: Option<ValidationReport>,
}

impl Checkpoint {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.report.as_ref().is_some_and(ValidationReport::is_valid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Before the split delimiter; `flushed` is the end of released narration
    Narration { flushed: usize },
    /// Payload starts at `start`
    Payload { start: usize },
}

/// Streaming checkpoint state machine for one generator stream
pub struct GenerationSession {
    label: String,
    plan: SessionPlan,
    buffer: StreamBuffer,
    phase: Phase,
    narration_scan: IncrementalScanner,
    payload_scan: IncrementalScanner,
    narration: Option<String>,
    checkpoints: Vec<Checkpoint>,
    emission: EmissionController,
    observer: Arc<dyn PipelineObserver>,
    memo: Option<Arc<dyn VerdictMemo>>,
}

impl std::fmt::Debug for GenerationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationSession")
            .field("label", &self.label)
            .field("phase", &self.phase)
            .field("buffered", &self.buffer.len())
            .field("checkpoints", &self.checkpoints.len())
            .finish_non_exhaustive()
    }
}

impl GenerationSession {
    /// Validate `config` and start a session
    ///
    /// # Errors
    /// Returns `ConfigError` if the configuration is unusable
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_plan(config.compile()?))
    }

    /// Start a session from an already compiled plan
    #[must_use]
    pub fn from_plan(plan: SessionPlan) -> Self {
        let phase = if plan.config().split_delimiter.is_some() {
            Phase::Narration { flushed: 0 }
        } else {
            Phase::Payload { start: 0 }
        };
        Self {
            label: "session".to_string(),
            narration_scan: IncrementalScanner::new(plan.narration_scanner().clone()),
            payload_scan: IncrementalScanner::new(plan.payload_scanner().clone()),
            plan,
            buffer: StreamBuffer::new(),
            phase,
            narration: None,
            checkpoints: Vec::new(),
            emission: EmissionController::new(),
            observer: Arc::new(TracingObserver),
            memo: None,
        }
    }

    /// With label used in observer callbacks
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// With observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// With verdict memo
    #[must_use]
    pub fn with_verdict_memo(mut self, memo: Arc<dyn VerdictMemo>) -> Self {
        self.memo = Some(memo);
        self
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        self.plan.config()
    }

    #[inline]
    #[must_use]
    pub fn observer(&self) -> &Arc<dyn PipelineObserver> {
        &self.observer
    }

    /// Accumulated text
    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &StreamBuffer {
        &self.buffer
    }

    /// Frozen narration, once the split delimiter has been seen
    #[inline]
    #[must_use]
    pub fn narration(&self) -> Option<&str> {
        self.narration.as_deref()
    }

    /// Whether the payload region has started
    #[must_use]
    pub fn in_payload(&self) -> bool {
        matches!(self.phase, Phase::Payload { .. })
    }

    /// Every checkpoint processed so far, in ordinal order
    #[inline]
    #[must_use]
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    #[inline]
    #[must_use]
    pub fn last_emitted_ordinal(&self) -> Option<u64> {
        self.emission.last_ordinal()
    }

    /// Process one chunk, returning the events it produced
    pub fn push_chunk(&mut self, chunk: &str) -> Vec<StreamEvent> {
        let index = self.buffer.chunk_count();
        self.buffer.append(chunk);
        self.observer.on_chunk(&self.label, index, chunk.len());

        let mut events = Vec::new();
        self.advance(false, &mut events);
        events
    }

    /// End of stream: final extraction, validation and the terminal event
    ///
    /// The returned events end with exactly one `Final`.
    #[must_use]
    pub fn finish(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        self.advance(true, &mut events);

        let payload = match self.phase {
            Phase::Payload { start } => self.buffer.tail_from(start),
            Phase::Narration { .. } => "",
        };
        let extraction = self
            .plan
            .extractor()
            .extract_final(payload, self.payload_scan.occurrences());
        if extraction.mode != FinalMode::Whole {
            tracing::debug!(session = %self.label, mode = ?extraction.mode, "final block spliced");
        }

        let report = self.verdict(&extraction.text);
        self.observer.on_validation(&self.label, None, &report);

        let (text, status, issues) = if report.is_valid() {
            (extraction.text, FinalStatus::Validated, Vec::new())
        } else if let Some(repaired) = self.try_repair(&extraction.text) {
            (repaired, FinalStatus::Repaired, Vec::new())
        } else {
            (extraction.text, FinalStatus::Degraded, report.issues())
        };

        let narration = if self.config().multi_artifact {
            self.narration.take().filter(|n| !n.is_empty())
        } else {
            None
        };
        let artifact = GeneratedArtifact::new(self.config().artifact_kind, text);
        let event = self.emission.finish(Completion {
            narration,
            artifact,
            status,
            issues,
        });
        self.observer.on_emit(&self.label, &event);
        self.observer.on_finish(&self.label, Some(status));
        events.push(event);
        events
    }

    /// Abort after an upstream failure
    ///
    /// Nothing accumulated so far is promoted to a final artifact.
    #[must_use]
    pub fn fail(self, reason: impl Into<String>) -> StreamEvent {
        let event = self.emission.fail(reason);
        self.observer.on_emit(&self.label, &event);
        self.observer.on_finish(&self.label, None);
        event
    }

    fn advance(&mut self, finished: bool, events: &mut Vec<StreamEvent>) {
        if let Phase::Narration { flushed } = self.phase {
            self.advance_narration(flushed, finished, events);
        }
        if let Phase::Payload { start } = self.phase {
            self.advance_payload(start, finished, events);
        }
    }

    fn advance_narration(&mut self, flushed: usize, finished: bool, events: &mut Vec<StreamEvent>) {
        let text = self.buffer.as_str();
        let confirmed = if finished {
            self.narration_scan.finish(text)
        } else {
            self.narration_scan.advance(text)
        };
        let report = self.narration_scan.report(text.len());
        self.observer
            .on_scan(&self.label, ScanRegion::Narration, confirmed, report.pending_from);

        if let Some(split) = report.first_split().copied() {
            self.release_narration(flushed, split.offset, true, events);
            self.narration = Some(self.buffer.as_str()[..split.offset].trim().to_string());
            self.phase = Phase::Payload { start: split.end() };
            self.observer.on_split(&self.label, split.offset);
            return;
        }

        if finished {
            let end = self.buffer.len();
            self.release_narration(flushed, end, true, events);
            self.narration = Some(self.buffer.as_str().trim().to_string());
        } else {
            let safe = report.safe_len(text.len());
            let released = self.release_narration(flushed, safe, false, events);
            self.phase = Phase::Narration { flushed: released };
        }
    }

    /// Release narration lines in `from..to`; a trailing partial line is
    /// released only when `include_partial` is set. Returns the new
    /// flushed offset.
    fn release_narration(
        &mut self,
        from: usize,
        to: usize,
        include_partial: bool,
        events: &mut Vec<StreamEvent>,
    ) -> usize {
        let Some(region) = self.buffer.as_str().get(from..to) else {
            return from;
        };
        let mut flushed = from;
        let mut lines = Vec::new();
        for line in region.split_inclusive('\n') {
            if !line.ends_with('\n') && !include_partial {
                break;
            }
            flushed += line.len();
            lines.push(line.trim_end().to_string());
        }

        if self.config().multi_artifact {
            for line in lines.into_iter().filter(|l| !l.trim().is_empty()) {
                self.observer.on_narration(&self.label, &line);
                let event = self.emission.narration(line);
                self.observer.on_emit(&self.label, &event);
                events.push(event);
            }
        }
        flushed
    }

    fn advance_payload(&mut self, start: usize, finished: bool, events: &mut Vec<StreamEvent>) {
        let payload = self.buffer.tail_from(start);
        let confirmed = if finished {
            self.payload_scan.finish(payload)
        } else {
            self.payload_scan.advance(payload)
        };
        let pending_from = (self.payload_scan.resume_at() < payload.len())
            .then_some(self.payload_scan.resume_at());
        self.observer
            .on_scan(&self.label, ScanRegion::Payload, confirmed, pending_from);
        if confirmed == 0 {
            return;
        }

        let extractions = self.plan.extractor().extract_new(
            payload,
            self.payload_scan.occurrences(),
            self.checkpoints.len(),
        );
        for extraction in extractions {
            self.observer
                .on_extraction(&self.label, extraction.ordinal, &extraction.outcome);
            let report = extraction.outcome.candidate().map(|text| {
                let report = self.verdict(text);
                self.observer
                    .on_validation(&self.label, Some(extraction.ordinal), &report);
                report
            });

            if let (Some(text), Some(report)) = (extraction.outcome.candidate(), &report) {
                if report.is_valid() {
                    let artifact = GeneratedArtifact::new(self.config().artifact_kind, text);
                    match self.emission.offer(extraction.ordinal, artifact) {
                        Offer::Emit(event) => {
                            self.observer.on_emit(&self.label, &event);
                            events.push(event);
                        }
                        Offer::Stale { .. } => {
                            self.observer.on_suppressed(&self.label, extraction.ordinal, "stale");
                        }
                        Offer::Unchanged => {
                            self.observer
                                .on_suppressed(&self.label, extraction.ordinal, "unchanged");
                        }
                    }
                }
            }

            self.checkpoints.push(Checkpoint {
                ordinal: extraction.ordinal,
                outcome: extraction.outcome,
                report,
            });
        }
    }

    fn verdict(&self, text: &str) -> ValidationReport {
        let validator = self.plan.validator();
        let Some(memo) = &self.memo else {
            return validator.validate(text);
        };
        let hash = ContentHash::of_text(text);
        if let Some(report) = memo.get(&hash) {
            return report;
        }
        let report = validator.validate(text);
        memo.put(hash, report.clone());
        report
    }

    /// First repair that validates, cleaned of markers
    fn try_repair(&self, text: &str) -> Option<String> {
        let repair = self.plan.repair();
        if !self.config().repair || !repair.looks_wrapped(text) {
            return None;
        }
        for (rule, repaired) in repair.candidates(text) {
            let cleaned = self.plan.extractor().cleanup().apply(&repaired);
            let accepted = self.verdict(&cleaned).is_valid();
            self.observer.on_repair(&self.label, rule, accepted);
            if accepted {
                return Some(cleaned);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{RecordingObserver, StageRecord};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn run(config: SessionConfig, chunks: &[&str]) -> Vec<StreamEvent> {
        let mut session = GenerationSession::new(config).unwrap();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(session.push_chunk(chunk));
        }
        events.extend(session.finish());
        events
    }

    #[test]
    fn narration_waits_for_complete_line() {
        let mut session = GenerationSession::new(SessionConfig::narration_and_code()).unwrap();
        assert!(session.push_chunk("Thinking about").is_empty());
        let events = session.push_chunk(" it.\nNext");
        assert_eq!(
            events,
            vec![StreamEvent::NarrationChunk { text: "Thinking about it.".into() }]
        );
    }

    #[test]
    fn split_freezes_narration_and_starts_payload() {
        let mut session = GenerationSession::new(SessionConfig::narration_and_code()).unwrap();
        let events = session.push_chunk("Plan A\nand B $GENERATING\ncode");
        assert_eq!(
            events,
            vec![
                StreamEvent::NarrationChunk { text: "Plan A".into() },
                StreamEvent::NarrationChunk { text: "and B".into() },
            ]
        );
        assert!(session.in_payload());
        assert_eq!(session.narration(), Some("Plan A\nand B"));
        assert!(session.push_chunk("\nmore narration?\n").is_empty());
    }

    #[test]
    fn code_only_mode_emits_no_narration() {
        let config = SessionConfig::narration_and_code().with_multi_artifact(false);
        let events = run(
            config,
            &["Plan\n$GENERATING\n", "export default function App() { return null; }"],
        );
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            StreamEvent::Final { narration: None, status: FinalStatus::Validated, .. }
        ));
    }

    #[test]
    fn missing_split_makes_everything_narration() {
        let events = run(SessionConfig::narration_and_code(), &["just talk\n", "no code"]);
        assert_eq!(events.len(), 3);
        match &events[2] {
            StreamEvent::Final { narration, artifact, status, issues, .. } => {
                assert_eq!(narration.as_deref(), Some("just talk\nno code"));
                assert_eq!(artifact.text(), "");
                assert_eq!(*status, FinalStatus::Degraded);
                assert!(!issues.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn repeated_checkpoint_is_emitted_once() {
        let block = "/*$COMPLETION\n}\n$END_COMPLETION*/\n// $CHECKPOINT\n";
        let text = format!(
            "export default function App() {{\n  return null;\n{block}{block}}}\n"
        );
        let observer = RecordingObserver::new();
        let mut session = GenerationSession::new(SessionConfig::checkpoint_only())
            .unwrap()
            .with_observer(Arc::new(observer.clone()));
        let mut events = session.push_chunk(&text);
        events.extend(session.finish());

        let ordinals: Vec<u64> = events.iter().filter_map(StreamEvent::ordinal).collect();
        assert_eq!(ordinals, vec![1]);
        assert_eq!(
            observer.filter(|r| matches!(r, StageRecord::Suppressed { .. })),
            vec![StageRecord::Suppressed { ordinal: 2, reason: "unchanged" }]
        );
    }

    #[test]
    fn fail_emits_single_failed_event() {
        let mut session = GenerationSession::new(SessionConfig::checkpoint_only()).unwrap();
        let _ = session.push_chunk("export default");
        let event = session.fail("socket closed");
        assert_eq!(event, StreamEvent::Failed { reason: "socket closed".into() });
    }

    #[test]
    fn wrapped_final_is_repaired() {
        let events = run(
            SessionConfig::checkpoint_only(),
            &["```tsx\nexport default function App() {\n  return null;\n}\n```\n"],
        );
        match events.last().unwrap() {
            StreamEvent::Final { artifact, status, .. } => {
                assert_eq!(*status, FinalStatus::Repaired);
                assert_eq!(artifact.text(), "export default function App() {\n  return null;\n}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn repair_can_be_disabled() {
        let events = run(
            SessionConfig::checkpoint_only().with_repair(false),
            &["```tsx\nexport default function App() {\n  return null;\n}\n```\n"],
        );
        assert_eq!(events.last().unwrap().final_status(), Some(FinalStatus::Degraded));
    }

    #[derive(Default)]
    struct CountingMemo {
        entries: Mutex<HashMap<ContentHash, ValidationReport>>,
        hits: Mutex<usize>,
    }

    impl VerdictMemo for CountingMemo {
        fn get(&self, hash: &ContentHash) -> Option<ValidationReport> {
            let found = self.entries.lock().get(hash).cloned();
            if found.is_some() {
                *self.hits.lock() += 1;
            }
            found
        }

        fn put(&self, hash: ContentHash, report: ValidationReport) {
            self.entries.lock().insert(hash, report);
        }
    }

    #[test]
    fn verdicts_are_memoized_by_content() {
        let memo = Arc::new(CountingMemo::default());
        let block = "/*$COMPLETION\n}\n$END_COMPLETION*/\n// $CHECKPOINT\n";
        let text = format!("export default function App() {{\n  return null;\n{block}{block}}}\n");
        let mut session = GenerationSession::new(SessionConfig::checkpoint_only())
            .unwrap()
            .with_verdict_memo(memo.clone());
        let _ = session.push_chunk(&text);
        let _ = session.finish();
        // checkpoint 2 and the final candidate repeat checkpoint 1
        assert_eq!(*memo.hits.lock(), 2);
    }
}
