//! Tastegen Artifact
//!
//! Vocabulary shared by the streaming core and its hosts.
//!
//! # Core Concepts
//!
//! - [`ArtifactKind`]: what a generation session produces (React component,
//!   HTML, JSON, ...)
//! - [`ArtifactRules`]: structural rules a candidate of that kind must satisfy
//! - [`GeneratedArtifact`]: an immutable, hashed text snapshot
//! - [`ContentHash`]: 32-byte Blake3 hash used to fingerprint snapshots
//!
//! # Example
//!
//! ```rust
//! use tastegen_artifact::{ArtifactKind, GeneratedArtifact};
//!
//! let rules = ArtifactKind::ReactComponent.rules();
//! assert!(!rules.anchors.is_empty());
//!
//! let snapshot = GeneratedArtifact::new(ArtifactKind::ReactComponent, "export default function App() {}");
//! println!("snapshot {}", snapshot.hash().short());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifact;
mod hash;
mod kind;
mod rules;

pub use artifact::GeneratedArtifact;
pub use hash::{ContentHash, HashError};
pub use kind::{ArtifactKind, UnknownKind};
pub use rules::{ArtifactRules, StructuralAnchor, GROUP_PAIRS};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
