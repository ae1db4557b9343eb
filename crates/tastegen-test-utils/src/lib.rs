//! Testing utilities for the Tastegen workspace
//!
//! Canned generator streams, chunkers and helpers for inspecting emitted
//! events.

#![allow(missing_docs)]

use async_trait::async_trait;
use futures::Stream;
use std::convert::Infallible;
use tastegen_artifact::GeneratedArtifact;
use tastegen_stream::{
    DeliveryError, EventSink, FinalStatus, GenerationSession, SessionConfig, StreamEvent,
};

pub mod fixtures {
    //! Recorded-looking generator output

    /// Narration, split delimiter, then a complete component
    pub const SCENARIO_A: &str =
        "Here is my plan.\n$GENERATING\nexport default function App(){return (<div>Hi</div>)}";

    /// Code after the split delimiter in [`SCENARIO_A`]
    pub const SCENARIO_A_CODE: &str = "export default function App(){return (<div>Hi</div>)}";

    /// Two well-formed checkpoints
    pub const REACT_TWO_CHECKPOINTS: &str = "export default function Counter() {
  const [count, setCount] = useState(0);
/*$COMPLETION
  return null;
}
$END_COMPLETION*/
// $CHECKPOINT
  return (
    <div>
      <p>{count}</p>
/*$COMPLETION
    </div>
  );
}
$END_COMPLETION*/
// $CHECKPOINT
    </div>
  );
}
";

    /// Candidate at the first checkpoint of [`REACT_TWO_CHECKPOINTS`]
    pub const REACT_FIRST_CANDIDATE: &str =
        "export default function Counter() {\n  const [count, setCount] = useState(0);\n  return null;\n}";

    /// Candidate at the second checkpoint, and the final artifact
    pub const REACT_COMPLETE: &str = "export default function Counter() {\n  const [count, setCount] = useState(0);\n  return (\n    <div>\n      <p>{count}</p>\n    </div>\n  );\n}";

    /// Second checkpoint leaves a `{` unmatched
    pub const REACT_UNBALANCED_SECOND: &str = "export default function Counter() {
  const [count, setCount] = useState(0);
/*$COMPLETION
  return null;
}
$END_COMPLETION*/
// $CHECKPOINT
  return (
    <div>
      <p>{count</p>
/*$COMPLETION
    </div>
  );
}
$END_COMPLETION*/
// $CHECKPOINT
    </div>
  );
}
";

    /// Generator stops right after its only checkpoint announcement
    pub const REACT_ENDS_ON_CHECKPOINT: &str = "export default function App() {
  const x = 1;
/*$COMPLETION
  return null;
}
$END_COMPLETION*/
// $CHECKPOINT
";

    /// Candidate at the checkpoint of [`REACT_ENDS_ON_CHECKPOINT`]
    pub const REACT_ENDS_ON_CHECKPOINT_CANDIDATE: &str =
        "export default function App() {\n  const x = 1;\n  return null;\n}";

    /// Stream cut off inside a completion block
    pub const REACT_CUT_OFF: &str = "export default function Counter() {
  const [count, setCount] = useState(0);
  return <p>{count}</p>;
/*$COMPLETION
}
";

    /// Narration followed by [`REACT_TWO_CHECKPOINTS`]
    #[must_use]
    pub fn narrated_checkpoints() -> String {
        format!("I'll build a counter.\nIt keeps state in a hook.\n$GENERATING\n{REACT_TWO_CHECKPOINTS}")
    }
}

/// Split into chunks of `n` characters (the last may be shorter)
#[must_use]
pub fn chunk_by(text: &str, n: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(n.max(1)).map(|c| c.iter().collect()).collect()
}

/// One chunk per character
#[must_use]
pub fn chars(text: &str) -> Vec<String> {
    chunk_by(text, 1)
}

/// Split at byte offsets, each moved back to a char boundary; out-of-range
/// and repeated offsets are ignored
#[must_use]
pub fn split_at(text: &str, offsets: &[usize]) -> Vec<String> {
    let mut cuts: Vec<usize> = offsets
        .iter()
        .filter(|&&o| o > 0 && o < text.len())
        .map(|&o| (0..=o).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0))
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut parts = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        if cut > start {
            parts.push(text[start..cut].to_string());
            start = cut;
        }
    }
    parts.push(text[start..].to_string());
    parts
}

/// Run a session synchronously over `chunks` and collect every event
pub fn replay<S: AsRef<str>>(config: SessionConfig, chunks: &[S]) -> Vec<StreamEvent> {
    let mut session = GenerationSession::new(config).unwrap();
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(session.push_chunk(chunk.as_ref()));
    }
    events.extend(session.finish());
    events
}

/// Infallible async chunk source
pub fn ok_stream<S: AsRef<str>>(chunks: &[S]) -> impl Stream<Item = Result<String, Infallible>> + Send {
    let owned: Vec<Result<String, Infallible>> =
        chunks.iter().map(|c| Ok(c.as_ref().to_string())).collect();
    futures::stream::iter(owned)
}

pub fn narration_texts(events: &[StreamEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::NarrationChunk { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

pub fn intermediate_ordinals(events: &[StreamEvent]) -> Vec<u64> {
    events.iter().filter_map(StreamEvent::ordinal).collect()
}

pub fn intermediates(events: &[StreamEvent]) -> Vec<(u64, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Intermediate { ordinal, artifact } => {
                Some((*ordinal, artifact.text().to_string()))
            }
            _ => None,
        })
        .collect()
}

/// The terminal `Final` event's parts; panics if the last event is not `Final`
pub fn final_parts(events: &[StreamEvent]) -> (Option<String>, GeneratedArtifact, FinalStatus) {
    match events.last() {
        Some(StreamEvent::Final {
            narration,
            artifact,
            status,
            ..
        }) => (narration.clone(), artifact.clone(), *status),
        other => panic!("expected final event last, got {other:?}"),
    }
}

/// Sink that refuses every event
#[derive(Debug, Default)]
pub struct RejectingSink {
    pub attempts: usize,
}

#[async_trait]
impl EventSink for RejectingSink {
    async fn deliver(&mut self, _event: StreamEvent) -> Result<(), DeliveryError> {
        self.attempts += 1;
        Err(DeliveryError::Rejected("test sink".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_by_respects_chars() {
        assert_eq!(chunk_by("héllo", 2), vec!["hé", "ll", "o"]);
        assert_eq!(chars("ab"), vec!["a", "b"]);
    }

    #[test]
    fn split_at_snaps_to_boundaries() {
        let parts = split_at("aé b", &[2, 2, 0, 99]);
        assert_eq!(parts.concat(), "aé b");
        assert_eq!(parts, vec!["a", "é b"]);
    }
}
