//! Tastegen Stream
//!
//! Incremental consumption of a chunked generator stream: marker scanning
//! that survives delimiters split across chunks, narration/payload
//! splitting, checkpoint extraction, structural validation and ordered,
//! deduplicated emission.
//!
//! # Pipeline
//!
//! ```text
//! chunk → StreamBuffer → MarkerScanner → split → CheckpointExtractor
//!       → ArtifactValidator → EmissionController → EventSink
//! ```
//!
//! # Example
//!
//! ```rust
//! use tastegen_stream::{GenerationSession, SessionConfig, StreamEvent};
//!
//! let mut session = GenerationSession::new(SessionConfig::narration_and_code()).unwrap();
//! let mut events = Vec::new();
//! for chunk in ["Plan.\n$GENER", "ATING\nexport default function App(){return null}"] {
//!     events.extend(session.push_chunk(chunk));
//! }
//! events.extend(session.finish());
//!
//! assert_eq!(events[0], StreamEvent::NarrationChunk { text: "Plan.".into() });
//! assert_eq!(events.last().unwrap().kind(), "final");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod buffer;
pub mod cleanup;
pub mod config;
pub mod driver;
pub mod emission;
pub mod error;
pub mod extractor;
pub mod observer;
pub mod repair;
pub mod scanner;
pub mod session;
pub mod validator;

pub use buffer::StreamBuffer;
pub use cleanup::{CleanupPipeline, CleanupRule};
pub use config::{CheckpointMarkers, SessionConfig, SessionPlan};
pub use driver::{run_session, run_session_until, EventSink, SessionSummary};
pub use emission::{EmissionController, FinalStatus, StreamEvent};
pub use error::{ConfigError, DeliveryError, StreamError, StreamResult};
pub use extractor::{CheckpointExtractor, Extraction, ExtractionOutcome, FinalMode};
pub use observer::{NoopObserver, PipelineObserver, RecordingObserver, StageRecord, TracingObserver};
pub use repair::{RepairPipeline, RepairRule};
pub use scanner::{Delimiter, DelimiterRole, IncrementalScanner, MarkerScanner, Occurrence, ScanReport};
pub use session::{Checkpoint, GenerationSession, VerdictMemo};
pub use validator::{ArtifactValidator, Check, ValidationFailure, ValidationReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
