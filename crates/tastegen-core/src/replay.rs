//! Replaying recorded generator output
//!
//! Used by the `tastegen-replay` binary to push a saved stream through a
//! session in fixed-size chunks, the way a live generator would deliver it.

use async_trait::async_trait;
use std::convert::Infallible;
use std::io::Write;
use tastegen_stream::{
    run_session, DeliveryError, EventSink, GenerationSession, SessionSummary, StreamEvent,
};

/// Split `text` into chunks of `size` characters
#[must_use]
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size.max(1)).map(|c| c.iter().collect()).collect()
}

/// One line of human-readable output for an event
#[must_use]
pub fn render_event(event: &StreamEvent) -> String {
    match event {
        StreamEvent::NarrationChunk { text } => format!("narration  | {text}"),
        StreamEvent::Intermediate { ordinal, artifact } => format!(
            "checkpoint | #{ordinal} {} ({} bytes)",
            artifact.hash().short(),
            artifact.text().len()
        ),
        StreamEvent::Final {
            artifact,
            status,
            last_intermediate,
            issues,
            ..
        } => {
            let mut line = format!(
                "final      | {status:?} {} ({} bytes, last checkpoint {})",
                artifact.hash().short(),
                artifact.text().len(),
                last_intermediate.map_or_else(|| "none".to_string(), |o| format!("#{o}"))
            );
            for issue in issues {
                line.push_str("\n           |   ");
                line.push_str(issue);
            }
            line
        }
        StreamEvent::Failed { reason } => format!("failed     | {reason}"),
    }
}

/// Writes each event as text or as a JSON line
#[derive(Debug)]
pub struct PrintSink<W> {
    out: W,
    json: bool,
}

impl<W: Write + Send> PrintSink<W> {
    #[must_use]
    pub fn new(out: W, json: bool) -> Self {
        Self { out, json }
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> EventSink for PrintSink<W> {
    async fn deliver(&mut self, event: StreamEvent) -> Result<(), DeliveryError> {
        let line = if self.json {
            serde_json::to_string(&event).map_err(|e| DeliveryError::Rejected(e.to_string()))?
        } else {
            render_event(&event)
        };
        writeln!(self.out, "{line}").map_err(|_| DeliveryError::Disconnected)
    }
}

/// Replay `text` through `session` in chunks of `chunk_size` characters
pub async fn replay_text<K: EventSink + ?Sized>(
    session: GenerationSession,
    text: &str,
    chunk_size: usize,
    sink: &mut K,
) -> SessionSummary {
    let chunks = chunk_text(text, chunk_size)
        .into_iter()
        .map(Ok::<_, Infallible>)
        .collect::<Vec<_>>();
    run_session(session, futures::stream::iter(chunks), sink).await
}
