//! Generated artifact snapshots
//!
//! A [`GeneratedArtifact`] is one fully cleaned, de-markered text snapshot of
//! the thing a session is producing. Snapshots are replaced wholesale, never
//! patched in place.

use crate::hash::ContentHash;
use crate::kind::ArtifactKind;
use serde::{Deserialize, Serialize};

/// Immutable text snapshot with its content hash
///
/// # Invariants
/// - `hash` is always `ContentHash::of_text(&text)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    kind: ArtifactKind,
    hash: ContentHash,
    text: String,
}

impl GeneratedArtifact {
    /// Create snapshot (computes hash)
    #[must_use]
    pub fn new(kind: ArtifactKind, text: impl Into<String>) -> Self {
        let text = text.into();
        let hash = ContentHash::of_text(&text);
        Self { kind, hash, text }
    }

    /// Artifact kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Content hash
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Snapshot text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume into text
    #[inline]
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Same bytes as `text`
    #[inline]
    #[must_use]
    pub fn same_content(&self, text: &str) -> bool {
        self.hash == ContentHash::of_text(text) && self.text == text
    }
}
