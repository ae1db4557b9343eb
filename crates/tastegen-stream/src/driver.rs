//! Async session driver
//!
//! [`run_session`] pulls chunks from an upstream stream, feeds them to a
//! [`GenerationSession`] one at a time and hands every resulting event to an
//! [`EventSink`]. Delivery is fire-and-forget: a failed delivery is reported
//! to the observer and counted, never propagated.

use crate::emission::{FinalStatus, StreamEvent};
use crate::error::{DeliveryError, StreamError};
use crate::observer::PipelineObserver;
use crate::session::GenerationSession;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Downstream consumer of session events
#[async_trait]
pub trait EventSink: Send {
    /// Deliver one event
    async fn deliver(&mut self, event: StreamEvent) -> Result<(), DeliveryError>;
}

#[async_trait]
impl EventSink for mpsc::Sender<StreamEvent> {
    async fn deliver(&mut self, event: StreamEvent) -> Result<(), DeliveryError> {
        self.send(event).await.map_err(|_| DeliveryError::Disconnected)
    }
}

#[async_trait]
impl EventSink for mpsc::UnboundedSender<StreamEvent> {
    async fn deliver(&mut self, event: StreamEvent) -> Result<(), DeliveryError> {
        self.send(event).map_err(|_| DeliveryError::Disconnected)
    }
}

#[async_trait]
impl EventSink for Vec<StreamEvent> {
    async fn deliver(&mut self, event: StreamEvent) -> Result<(), DeliveryError> {
        self.push(event);
        Ok(())
    }
}

#[async_trait]
impl<S: EventSink + ?Sized> EventSink for &mut S {
    async fn deliver(&mut self, event: StreamEvent) -> Result<(), DeliveryError> {
        (**self).deliver(event).await
    }
}

#[async_trait]
impl<S: EventSink + ?Sized> EventSink for Box<S> {
    async fn deliver(&mut self, event: StreamEvent) -> Result<(), DeliveryError> {
        (**self).deliver(event).await
    }
}

/// What happened to a session
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub label: String,
    /// Chunks processed
    pub chunks: usize,
    /// Bytes processed
    pub bytes: usize,
    /// Intermediate events produced
    pub intermediates: usize,
    /// Terminal event, unless cancelled
    pub terminal: Option<StreamEvent>,
    /// Events the sink did not accept
    pub delivery_failures: usize,
    /// Upstream failure that ended the session
    pub failure: Option<StreamError>,
    pub cancelled: bool,
}

impl SessionSummary {
    #[must_use]
    pub fn final_status(&self) -> Option<FinalStatus> {
        self.terminal.as_ref().and_then(StreamEvent::final_status)
    }

    /// The final artifact passed validation, possibly after repair
    #[must_use]
    pub fn is_validated(&self) -> bool {
        matches!(
            self.final_status(),
            Some(FinalStatus::Validated | FinalStatus::Repaired)
        )
    }
}

enum Step<T> {
    Chunk(T),
    Ended,
    Idle(u64),
    Cancelled,
}

/// Drive `session` to completion over `chunks`
pub async fn run_session<S, E, K>(session: GenerationSession, chunks: S, sink: &mut K) -> SessionSummary
where
    S: Stream<Item = Result<String, E>> + Send,
    E: Display + Send,
    K: EventSink + ?Sized,
{
    run_session_until(session, chunks, sink, std::future::pending::<()>()).await
}

/// Drive `session` until the stream ends or `cancel` completes
///
/// Cancellation is observed only between chunks: the chunk being processed
/// always completes. A cancelled session emits no terminal event.
pub async fn run_session_until<S, E, K, C>(
    session: GenerationSession,
    chunks: S,
    sink: &mut K,
    cancel: C,
) -> SessionSummary
where
    S: Stream<Item = Result<String, E>> + Send,
    E: Display + Send,
    K: EventSink + ?Sized,
    C: Future<Output = ()> + Send,
{
    let mut summary = SessionSummary {
        label: session.label().to_string(),
        ..SessionSummary::default()
    };
    let observer = Arc::clone(session.observer());
    let idle = session.config().idle_timeout();
    let mut session = session;
    let mut chunks = std::pin::pin!(chunks);
    let mut cancel = std::pin::pin!(cancel);

    loop {
        let step = tokio::select! {
            biased;
            () = &mut cancel => Step::Cancelled,
            next = next_chunk(chunks.as_mut(), idle) => next,
        };

        match step {
            Step::Chunk(Ok(chunk)) => {
                summary.chunks += 1;
                summary.bytes += chunk.len();
                for event in session.push_chunk(&chunk) {
                    deliver(sink, observer.as_ref(), &mut summary, event).await;
                }
            }
            Step::Chunk(Err(e)) => {
                let failure = StreamError::upstream(e);
                let event = session.fail(failure.to_string());
                summary.failure = Some(failure);
                deliver(sink, observer.as_ref(), &mut summary, event).await;
                break;
            }
            Step::Idle(millis) => {
                let failure = StreamError::IdleTimeout { millis };
                let event = session.fail(failure.to_string());
                summary.failure = Some(failure);
                deliver(sink, observer.as_ref(), &mut summary, event).await;
                break;
            }
            Step::Ended => {
                for event in session.finish() {
                    deliver(sink, observer.as_ref(), &mut summary, event).await;
                }
                break;
            }
            Step::Cancelled => {
                tracing::info!(session = %summary.label, chunks = summary.chunks, "session cancelled");
                summary.cancelled = true;
                drop(session);
                break;
            }
        }
    }
    summary
}

async fn next_chunk<S, T>(chunks: std::pin::Pin<&mut S>, idle: Option<std::time::Duration>) -> Step<T>
where
    S: Stream<Item = T>,
    T: Send,
{
    let mut chunks = chunks;
    let next = match idle {
        Some(limit) => match tokio::time::timeout(limit, chunks.next()).await {
            Ok(next) => next,
            Err(_) => return Step::Idle(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)),
        },
        None => chunks.next().await,
    };
    next.map_or(Step::Ended, Step::Chunk)
}

async fn deliver<K: EventSink + ?Sized>(
    sink: &mut K,
    observer: &dyn PipelineObserver,
    summary: &mut SessionSummary,
    event: StreamEvent,
) {
    if matches!(event, StreamEvent::Intermediate { .. }) {
        summary.intermediates += 1;
    }
    if event.is_terminal() {
        summary.terminal = Some(event.clone());
    }
    if let Err(error) = sink.deliver(event).await {
        summary.delivery_failures += 1;
        observer.on_delivery_failure(&summary.label, &error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use std::convert::Infallible;

    fn ok_chunks(parts: &[&str]) -> impl Stream<Item = Result<String, Infallible>> + Send {
        futures::stream::iter(parts.iter().map(|p| Ok(p.to_string())).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn collects_into_vec_sink() {
        let session = GenerationSession::new(SessionConfig::narration_and_code()).unwrap();
        let mut sink: Vec<StreamEvent> = Vec::new();
        let summary = run_session(
            session,
            ok_chunks(&["Hi.\n$GENER", "ATING\nexport default function App(){return 1}"]),
            &mut sink,
        )
        .await;
        assert_eq!(summary.chunks, 2);
        assert!(summary.is_validated());
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0], StreamEvent::NarrationChunk { text: "Hi.".into() });
        assert_eq!(sink[1].kind(), "final");
    }

    #[tokio::test]
    async fn closed_receiver_does_not_abort_session() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = tx;
        let session = GenerationSession::new(SessionConfig::narration_and_code()).unwrap();
        let summary = run_session(session, ok_chunks(&["a\n", "b\n"]), &mut sink).await;
        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.delivery_failures, 3);
        assert!(summary.terminal.is_some());
    }

    #[tokio::test]
    async fn upstream_error_fails_session() {
        let chunks = futures::stream::iter(vec![
            Ok("export default".to_string()),
            Err("connection reset"),
        ]);
        let session = GenerationSession::new(SessionConfig::checkpoint_only()).unwrap();
        let mut sink: Vec<StreamEvent> = Vec::new();
        let summary = run_session(session, chunks, &mut sink).await;
        assert!(matches!(summary.failure, Some(StreamError::Upstream(_))));
        assert_eq!(
            sink,
            vec![StreamEvent::Failed {
                reason: "upstream stream failed: connection reset".into()
            }]
        );
    }
}
