//! Concurrent fan-out of screen sessions
//!
//! One session per screen, at most `max_concurrent_sessions` in flight,
//! joined with an all-complete barrier. Sessions share nothing mutable:
//! each gets its own buffer, emission state and verdict cache.

use crate::cache::VerdictCache;
use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::types::{ScreenEvent, ScreenJob, SessionId, SessionOutcome};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tastegen_stream::{
    run_session, DeliveryError, EventSink, GenerationSession, PipelineObserver, SessionPlan,
    StreamEvent, TracingObserver,
};
use tokio::sync::mpsc;

/// Keeps every event and forwards a tagged copy downstream
#[derive(Debug)]
pub struct ForwardingSink {
    session: SessionId,
    screen: String,
    events: Vec<StreamEvent>,
    outbound: Option<mpsc::UnboundedSender<ScreenEvent>>,
}

impl ForwardingSink {
    #[must_use]
    pub fn new(
        session: SessionId,
        screen: impl Into<String>,
        outbound: Option<mpsc::UnboundedSender<ScreenEvent>>,
    ) -> Self {
        Self {
            session,
            screen: screen.into(),
            events: Vec::new(),
            outbound,
        }
    }

    #[must_use]
    pub fn into_events(self) -> Vec<StreamEvent> {
        self.events
    }
}

#[async_trait]
impl EventSink for ForwardingSink {
    async fn deliver(&mut self, event: StreamEvent) -> std::result::Result<(), DeliveryError> {
        self.events.push(event.clone());
        match &self.outbound {
            Some(tx) => tx
                .send(ScreenEvent {
                    session: self.session,
                    screen: self.screen.clone(),
                    event,
                })
                .map_err(|_| DeliveryError::Disconnected),
            None => Ok(()),
        }
    }
}

/// Runs many independent sessions
pub struct ScreenOrchestrator {
    config: OrchestratorConfig,
    plan: SessionPlan,
    observer: Arc<dyn PipelineObserver>,
}

impl std::fmt::Debug for ScreenOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScreenOrchestrator {
    /// Validate `config` and compile the shared session plan
    ///
    /// # Errors
    /// Returns error if the configuration is unusable
    pub fn new(config: OrchestratorConfig) -> Result<Self> {
        config.validate()?;
        let plan = config.session.compile()?;
        Ok(Self {
            config,
            plan,
            observer: Arc::new(TracingObserver),
        })
    }

    /// With observer shared by all sessions
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Start a session for one job, with its own verdict cache
    #[must_use]
    pub fn session_for(&self, id: SessionId, screen: &str) -> GenerationSession {
        let session = GenerationSession::from_plan(self.plan.clone())
            .with_label(format!("{screen}:{id}"))
            .with_observer(Arc::clone(&self.observer));
        match self.config.verdict_cache_capacity {
            0 => session,
            capacity => session.with_verdict_memo(Arc::new(VerdictCache::new(capacity))),
        }
    }

    /// Run every job to completion; outcomes are in job order
    ///
    /// Events are also forwarded, tagged, to `outbound` if given. A closed
    /// outbound channel does not stop any session.
    ///
    /// # Errors
    /// Returns error if a session task panicked
    pub async fn run_all<S, E>(
        &self,
        jobs: Vec<ScreenJob<S>>,
        outbound: Option<mpsc::UnboundedSender<ScreenEvent>>,
    ) -> Result<Vec<SessionOutcome>>
    where
        S: Stream<Item = std::result::Result<String, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        tracing::info!(
            "Running {} screen sessions (max {} concurrent)",
            jobs.len(),
            self.config.max_concurrent_sessions
        );

        let results: Vec<_> = futures::stream::iter(jobs)
            .map(|job| {
                let session = self.session_for(job.id, &job.screen);
                let sink = ForwardingSink::new(job.id, job.screen.clone(), outbound.clone());
                tokio::spawn(run_job(job, session, sink))
            })
            .buffered(self.config.max_concurrent_sessions)
            .collect()
            .await;

        let outcomes = results.into_iter().collect::<std::result::Result<Vec<_>, _>>()?;
        let validated = outcomes.iter().filter(|o| o.summary.is_validated()).count();
        tracing::info!("Screen sessions complete: {}/{} validated", validated, outcomes.len());
        Ok(outcomes)
    }
}

async fn run_job<S, E>(job: ScreenJob<S>, session: GenerationSession, mut sink: ForwardingSink) -> SessionOutcome
where
    S: Stream<Item = std::result::Result<String, E>> + Send,
    E: Display + Send,
{
    let summary = run_session(session, job.chunks, &mut sink).await;
    SessionOutcome {
        id: job.id,
        screen: job.screen,
        events: sink.into_events(),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwarding_sink_tags_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = SessionId::new();
        let mut sink = ForwardingSink::new(id, "home", Some(tx));
        sink.deliver(StreamEvent::NarrationChunk { text: "a".into() })
            .await
            .unwrap();
        let forwarded = rx.recv().await.unwrap();
        assert_eq!(forwarded.session, id);
        assert_eq!(forwarded.screen, "home");
        assert_eq!(sink.into_events().len(), 1);
    }

    #[tokio::test]
    async fn forwarding_sink_keeps_events_when_downstream_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = ForwardingSink::new(SessionId::new(), "home", Some(tx));
        let result = sink.deliver(StreamEvent::Failed { reason: "x".into() }).await;
        assert_eq!(result, Err(DeliveryError::Disconnected));
        assert_eq!(sink.into_events().len(), 1);
    }

    #[test]
    fn zero_capacity_disables_cache() {
        let config = OrchestratorConfig::new().with_verdict_cache_capacity(0);
        let orchestrator = ScreenOrchestrator::new(config).unwrap();
        let session = orchestrator.session_for(SessionId::new(), "home");
        assert!(session.label().starts_with("home:"));
    }
}
