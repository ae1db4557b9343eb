//! Ordered, deduplicated emission
//!
//! # Guarantees
//! - Intermediate ordinals are strictly increasing
//! - A candidate identical to the last emitted one is not emitted again
//! - The terminal event is produced by consuming the controller, so nothing
//!   can follow it

use serde::{Deserialize, Serialize};
use tastegen_artifact::GeneratedArtifact;

/// How far the final artifact got through validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    /// Passed validation as extracted
    Validated,
    /// Passed validation after unwrapping
    Repaired,
    /// Failed validation; emitted anyway so the caller can decide
    Degraded,
}

/// Event delivered to the downstream consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Narration released before the split delimiter
    NarrationChunk { text: String },
    /// Validated checkpoint snapshot
    Intermediate {
        ordinal: u64,
        artifact: GeneratedArtifact,
    },
    /// Terminal artifact
    Final {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        narration: Option<String>,
        artifact: GeneratedArtifact,
        status: FinalStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_intermediate: Option<u64>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        issues: Vec<String>,
    },
    /// Terminal failure
    Failed { reason: String },
}

impl StreamEvent {
    /// Wire name of the event kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::NarrationChunk { .. } => "narration_chunk",
            StreamEvent::Intermediate { .. } => "intermediate",
            StreamEvent::Final { .. } => "final",
            StreamEvent::Failed { .. } => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Final { .. } | StreamEvent::Failed { .. })
    }

    #[must_use]
    pub fn ordinal(&self) -> Option<u64> {
        match self {
            StreamEvent::Intermediate { ordinal, .. } => Some(*ordinal),
            _ => None,
        }
    }

    #[must_use]
    pub fn artifact(&self) -> Option<&GeneratedArtifact> {
        match self {
            StreamEvent::Intermediate { artifact, .. } | StreamEvent::Final { artifact, .. } => {
                Some(artifact)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn final_status(&self) -> Option<FinalStatus> {
        match self {
            StreamEvent::Final { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result of offering a validated candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offer {
    /// Emit this event
    Emit(StreamEvent),
    /// Ordinal not above the last emitted one
    Stale { last: u64 },
    /// Same content as the last emitted artifact
    Unchanged,
}

/// Final artifact plus its surroundings
#[derive(Debug, Clone)]
pub struct Completion {
    pub narration: Option<String>,
    pub artifact: GeneratedArtifact,
    pub status: FinalStatus,
    pub issues: Vec<String>,
}

/// Per-session emission state
#[derive(Debug, Clone, Default)]
pub struct EmissionController {
    last_ordinal: Option<u64>,
    last_artifact: Option<GeneratedArtifact>,
    intermediates: usize,
}

impl EmissionController {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn last_ordinal(&self) -> Option<u64> {
        self.last_ordinal
    }

    #[inline]
    #[must_use]
    pub fn last_artifact(&self) -> Option<&GeneratedArtifact> {
        self.last_artifact.as_ref()
    }

    /// Intermediates emitted so far
    #[inline]
    #[must_use]
    pub fn intermediates(&self) -> usize {
        self.intermediates
    }

    /// Offer a validated candidate for `ordinal`
    pub fn offer(&mut self, ordinal: u64, artifact: GeneratedArtifact) -> Offer {
        if let Some(last) = self.last_ordinal.filter(|last| ordinal <= *last) {
            return Offer::Stale { last };
        }
        if self
            .last_artifact
            .as_ref()
            .is_some_and(|last| last.same_content(artifact.text()))
        {
            return Offer::Unchanged;
        }
        self.last_ordinal = Some(ordinal);
        self.last_artifact = Some(artifact.clone());
        self.intermediates += 1;
        Offer::Emit(StreamEvent::Intermediate { ordinal, artifact })
    }

    /// Narration event for a released line
    #[must_use]
    pub fn narration(&self, text: impl Into<String>) -> StreamEvent {
        StreamEvent::NarrationChunk { text: text.into() }
    }

    /// Terminal artifact event
    #[must_use]
    pub fn finish(self, completion: Completion) -> StreamEvent {
        StreamEvent::Final {
            narration: completion.narration,
            artifact: completion.artifact,
            status: completion.status,
            last_intermediate: self.last_ordinal,
            issues: completion.issues,
        }
    }

    /// Terminal failure event
    #[must_use]
    pub fn fail(self, reason: impl Into<String>) -> StreamEvent {
        StreamEvent::Failed {
            reason: reason.into(),
        }
    }
}
