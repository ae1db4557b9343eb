//! Checkpoint extraction
//!
//! The generator announces progress with an outer announcement line and,
//! just before it, an inner completion block holding the text that would
//! close the artifact at that point:
//!
//! ```text
//! export default function App() {
//!   const [n, setN] = useState(0);
//! /*$COMPLETION
//!   return null;
//! }
//! $END_COMPLETION*/
//! // $CHECKPOINT
//! ```
//!
//! A candidate is the payload before the block, with the block interior
//! spliced on as its tail, then cleaned. Only the segment between the
//! previous announcement and the current one is searched for the block, so
//! an announcement without a fresh block never reuses an older completion.

use crate::cleanup::CleanupPipeline;
use crate::config::CheckpointMarkers;
use crate::scanner::{DelimiterRole, MarkerScanner, Occurrence};
use serde::Serialize;

/// What one announcement yielded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "candidate", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// Reconstructed, cleaned candidate text
    Candidate(String),
    /// Announcement with no completion block in its segment
    MissingBlock,
    /// Completion block opened but not closed before the announcement
    UnterminatedBlock,
}

impl ExtractionOutcome {
    #[must_use]
    pub fn candidate(&self) -> Option<&str> {
        match self {
            ExtractionOutcome::Candidate(text) => Some(text),
            _ => None,
        }
    }

    /// Stable name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionOutcome::Candidate(_) => "candidate",
            ExtractionOutcome::MissingBlock => "missing_block",
            ExtractionOutcome::UnterminatedBlock => "unterminated_block",
        }
    }
}

/// Extraction for one announcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// 1-based position of the announcement in the payload
    pub ordinal: u64,
    /// Payload offset of the announcement token
    pub offset: usize,
    pub outcome: ExtractionOutcome,
}

/// How the end-of-stream candidate was built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalMode {
    /// Whole payload, cleaned
    Whole,
    /// A closed block ended the stream and was spliced as an implicit checkpoint
    ClosedTail,
    /// An unterminated block was closed by the end of the stream
    Salvaged,
    /// The stream ended on an announcement; its checkpoint candidate stands
    LastCheckpoint,
}

/// End-of-stream candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalExtraction {
    pub text: String,
    pub mode: FinalMode,
}

/// Mechanical candidate reconstruction over a payload
#[derive(Debug, Clone)]
pub struct CheckpointExtractor {
    markers: CheckpointMarkers,
    scanner: MarkerScanner,
    cleanup: CleanupPipeline,
}

impl CheckpointExtractor {
    #[must_use]
    pub fn new(markers: CheckpointMarkers, cleanup: CleanupPipeline) -> Self {
        Self {
            scanner: MarkerScanner::new(markers.delimiters()),
            markers,
            cleanup,
        }
    }

    #[inline]
    #[must_use]
    pub fn markers(&self) -> &CheckpointMarkers {
        &self.markers
    }

    #[inline]
    #[must_use]
    pub fn cleanup(&self) -> &CleanupPipeline {
        &self.cleanup
    }

    /// Scan `payload` and extract every announcement after the first `seen`
    #[must_use]
    pub fn extract(&self, payload: &str, seen: usize) -> Vec<Extraction> {
        let report = self.scanner.scan(payload, false);
        self.extract_new(payload, &report.occurrences, seen)
    }

    /// Extract every announcement after the first `seen`, given the
    /// confirmed occurrences of the checkpoint tokens in `payload`
    #[must_use]
    pub fn extract_new(
        &self,
        payload: &str,
        occurrences: &[Occurrence],
        seen: usize,
    ) -> Vec<Extraction> {
        let mut segment_start = 0;
        let mut out = Vec::new();
        let mut ordinal = 0u64;
        for announcement in occurrences
            .iter()
            .filter(|o| o.role == DelimiterRole::Announcement)
        {
            ordinal += 1;
            let start = segment_start;
            segment_start = announcement.end();
            if ordinal <= seen as u64 {
                continue;
            }
            out.push(Extraction {
                ordinal,
                offset: announcement.offset,
                outcome: self.extract_segment(payload, occurrences, start, announcement.offset),
            });
        }
        out
    }

    /// Candidate for the announcement at `end`, searching `start..end` for the block
    fn extract_segment(
        &self,
        payload: &str,
        occurrences: &[Occurrence],
        start: usize,
        end: usize,
    ) -> ExtractionOutcome {
        let Some(open) = last_open(occurrences, start, end) else {
            return ExtractionOutcome::MissingBlock;
        };
        let Some(close) = first_close(occurrences, open.end(), end) else {
            return ExtractionOutcome::UnterminatedBlock;
        };
        let head = format!("{}{}", &payload[..open.offset], &payload[close.end()..end]);
        let spliced = splice(&head, &payload[open.end()..close.offset]);
        ExtractionOutcome::Candidate(self.cleanup.apply(&spliced))
    }

    /// End-of-stream candidate; never defers
    ///
    /// `occurrences` must come from a finished scan of `payload`.
    #[must_use]
    pub fn extract_final(&self, payload: &str, occurrences: &[Occurrence]) -> FinalExtraction {
        let mut announcements = occurrences
            .iter()
            .rev()
            .filter(|o| o.role == DelimiterRole::Announcement);
        let last = announcements.next();
        let tail_start = last.map_or(0, Occurrence::end);

        if let Some(last) = last.filter(|_| payload[tail_start..].trim().is_empty()) {
            let start = announcements.next().map_or(0, Occurrence::end);
            if let ExtractionOutcome::Candidate(text) =
                self.extract_segment(payload, occurrences, start, last.offset)
            {
                return FinalExtraction {
                    text,
                    mode: FinalMode::LastCheckpoint,
                };
            }
        }

        if let Some(open) = last_open(occurrences, tail_start, payload.len()) {
            match first_close(occurrences, open.end(), payload.len()) {
                None => {
                    let spliced = splice(&payload[..open.offset], &payload[open.end()..]);
                    return FinalExtraction {
                        text: self.cleanup.apply(&spliced),
                        mode: FinalMode::Salvaged,
                    };
                }
                Some(close) if payload[close.end()..].trim().is_empty() => {
                    let spliced = splice(&payload[..open.offset], &payload[open.end()..close.offset]);
                    return FinalExtraction {
                        text: self.cleanup.apply(&spliced),
                        mode: FinalMode::ClosedTail,
                    };
                }
                Some(_) => {}
            }
        }

        FinalExtraction {
            text: self.cleanup.apply(payload),
            mode: FinalMode::Whole,
        }
    }
}

fn last_open(occurrences: &[Occurrence], start: usize, end: usize) -> Option<&Occurrence> {
    occurrences
        .iter()
        .rev()
        .find(|o| o.role == DelimiterRole::BlockOpen && o.offset >= start && o.end() <= end)
}

fn first_close(occurrences: &[Occurrence], start: usize, end: usize) -> Option<&Occurrence> {
    occurrences
        .iter()
        .find(|o| o.role == DelimiterRole::BlockClose && o.offset >= start && o.end() <= end)
}

/// Join a head with a completion on a line boundary
fn splice(head: &str, completion: &str) -> String {
    let head = head.trim_end();
    let completion = completion.trim_start_matches(['\r', '\n']).trim_end();
    match (head.is_empty(), completion.is_empty()) {
        (true, _) => completion.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head}\n{completion}"),
    }
}
