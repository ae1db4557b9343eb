//! Core orchestration types
//!
//! - Session identifiers
//! - Screen jobs (one generator stream per UI screen)
//! - Per-session outcomes

use serde::{Deserialize, Serialize};
use tastegen_stream::{SessionSummary, StreamEvent};
use ulid::Ulid;

/// Unique session identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One screen to generate
#[derive(Debug)]
pub struct ScreenJob<S> {
    pub id: SessionId,
    /// Screen name, used in logs and forwarded events
    pub screen: String,
    /// Upstream chunk source
    pub chunks: S,
}

impl<S> ScreenJob<S> {
    /// Create job with a fresh session ID
    #[must_use]
    pub fn new(screen: impl Into<String>, chunks: S) -> Self {
        Self {
            id: SessionId::new(),
            screen: screen.into(),
            chunks,
        }
    }
}

/// Session event tagged with its origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenEvent {
    pub session: SessionId,
    pub screen: String,
    #[serde(flatten)]
    pub event: StreamEvent,
}

/// What one screen session produced
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub id: SessionId,
    pub screen: String,
    /// Every event produced, in order
    pub events: Vec<StreamEvent>,
    pub summary: SessionSummary,
}

impl SessionOutcome {
    /// The terminal event
    #[must_use]
    pub fn terminal(&self) -> Option<&StreamEvent> {
        self.summary.terminal.as_ref()
    }

    /// Final artifact text, if the session reached one
    #[must_use]
    pub fn final_text(&self) -> Option<&str> {
        match self.terminal() {
            Some(StreamEvent::Final { artifact, .. }) => Some(artifact.text()),
            _ => None,
        }
    }
}
