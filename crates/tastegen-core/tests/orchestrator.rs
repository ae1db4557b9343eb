//! Concurrent screen sessions through the orchestrator

use futures::stream;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tastegen_core::{OrchestratorConfig, ScreenEvent, ScreenJob, ScreenOrchestrator};
use tastegen_stream::{FinalStatus, RecordingObserver, StageRecord, StreamEvent};
use tastegen_test_utils::fixtures::{
    REACT_COMPLETE, REACT_FIRST_CANDIDATE, REACT_TWO_CHECKPOINTS, REACT_UNBALANCED_SECOND,
};
use tastegen_test_utils::{chunk_by, intermediate_ordinals};
use tokio::sync::mpsc;

type Chunks = stream::Iter<std::vec::IntoIter<Result<String, String>>>;

fn job(screen: &str, text: &str, chunk: usize) -> ScreenJob<Chunks> {
    let chunks: Vec<Result<String, String>> = chunk_by(text, chunk).into_iter().map(Ok).collect();
    ScreenJob::new(screen, stream::iter(chunks))
}

fn broken_job(screen: &str) -> ScreenJob<Chunks> {
    let chunks = vec![
        Ok("export default function Broken() {\n".to_string()),
        Err("connection reset".to_string()),
    ];
    ScreenJob::new(screen, stream::iter(chunks))
}

#[tokio::test]
async fn test_outcomes_follow_job_order() {
    let orchestrator = ScreenOrchestrator::new(OrchestratorConfig::new()).unwrap();
    let jobs = vec![
        job("home", REACT_TWO_CHECKPOINTS, 7),
        job("settings", REACT_TWO_CHECKPOINTS, 1),
        job("profile", REACT_TWO_CHECKPOINTS, 64),
    ];
    let ids: Vec<_> = jobs.iter().map(|j| j.id).collect();

    let outcomes = orchestrator.run_all(jobs, None).await.unwrap();

    let screens: Vec<&str> = outcomes.iter().map(|o| o.screen.as_str()).collect();
    assert_eq!(screens, vec!["home", "settings", "profile"]);
    assert_eq!(outcomes.iter().map(|o| o.id).collect::<Vec<_>>(), ids);
    for outcome in &outcomes {
        assert_eq!(intermediate_ordinals(&outcome.events), vec![1, 2]);
        assert_eq!(outcome.final_text(), Some(REACT_COMPLETE));
        assert!(outcome.summary.is_validated());
    }
}

#[tokio::test]
async fn test_failing_upstream_does_not_affect_other_sessions() {
    let orchestrator = ScreenOrchestrator::new(OrchestratorConfig::new()).unwrap();
    let jobs = vec![
        job("home", REACT_TWO_CHECKPOINTS, 5),
        broken_job("checkout"),
        job("about", REACT_TWO_CHECKPOINTS, 9),
    ];

    let outcomes = orchestrator.run_all(jobs, None).await.unwrap();

    assert!(outcomes[0].summary.is_validated());
    assert!(outcomes[2].summary.is_validated());

    let broken = &outcomes[1];
    assert!(broken.summary.failure.is_some());
    assert_eq!(broken.final_text(), None);
    match broken.terminal() {
        Some(StreamEvent::Failed { reason }) => assert!(reason.contains("connection reset")),
        other => panic!("expected failed terminal event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_events_are_forwarded_with_origin() {
    let orchestrator = ScreenOrchestrator::new(OrchestratorConfig::new()).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel::<ScreenEvent>();
    let jobs = vec![
        job("home", REACT_TWO_CHECKPOINTS, 3),
        job("cart", REACT_UNBALANCED_SECOND, 3),
    ];
    let home = jobs[0].id;

    let outcomes = orchestrator.run_all(jobs, Some(tx)).await.unwrap();

    let mut forwarded = Vec::new();
    while let Some(event) = rx.recv().await {
        forwarded.push(event);
    }

    let home_events: Vec<StreamEvent> = forwarded
        .iter()
        .filter(|e| e.session == home)
        .map(|e| e.event.clone())
        .collect();
    assert_eq!(home_events, outcomes[0].events);
    assert!(forwarded
        .iter()
        .filter(|e| e.session == home)
        .all(|e| e.screen == "home"));

    let cart: Vec<&ScreenEvent> = forwarded.iter().filter(|e| e.screen == "cart").collect();
    assert_eq!(cart.len(), outcomes[1].events.len());
    assert_eq!(outcomes[1].summary.final_status(), Some(FinalStatus::Degraded));
    assert_eq!(
        outcomes[1]
            .events
            .iter()
            .filter_map(StreamEvent::artifact)
            .next()
            .map(|a| a.text().to_string()),
        Some(REACT_FIRST_CANDIDATE.to_string())
    );
}

#[tokio::test]
async fn test_closed_outbound_channel_counts_delivery_failures() {
    let orchestrator = ScreenOrchestrator::new(OrchestratorConfig::new()).unwrap();
    let (tx, rx) = mpsc::unbounded_channel::<ScreenEvent>();
    drop(rx);

    let outcomes = orchestrator
        .run_all(vec![job("home", REACT_TWO_CHECKPOINTS, 16)], Some(tx))
        .await
        .unwrap();

    let outcome = &outcomes[0];
    assert!(outcome.summary.is_validated());
    assert_eq!(outcome.summary.delivery_failures, outcome.events.len());
}

#[tokio::test]
async fn test_single_slot_runs_every_job() {
    let config = OrchestratorConfig::new()
        .with_max_concurrent_sessions(1)
        .with_verdict_cache_capacity(0);
    let orchestrator = ScreenOrchestrator::new(config).unwrap();
    let jobs = (0..4)
        .map(|i| job(&format!("screen-{i}"), REACT_TWO_CHECKPOINTS, i + 1))
        .collect();

    let outcomes = orchestrator.run_all(jobs, None).await.unwrap();

    assert_eq!(outcomes.len(), 4);
    assert!(outcomes.iter().all(|o| o.summary.is_validated()));
}

#[tokio::test]
async fn test_shared_observer_sees_every_session() {
    let recorder = RecordingObserver::default();
    let orchestrator = ScreenOrchestrator::new(OrchestratorConfig::new())
        .unwrap()
        .with_observer(Arc::new(recorder.clone()));
    let jobs = vec![
        job("a", REACT_TWO_CHECKPOINTS, 4),
        job("b", REACT_TWO_CHECKPOINTS, 11),
    ];

    orchestrator.run_all(jobs, None).await.unwrap();

    let finishes = recorder
        .records()
        .into_iter()
        .filter(|r| matches!(r, StageRecord::Finish { .. }))
        .count();
    assert_eq!(finishes, 2);
}

#[tokio::test]
async fn test_no_jobs_is_ok() {
    let orchestrator = ScreenOrchestrator::new(OrchestratorConfig::new()).unwrap();
    let outcomes = orchestrator.run_all(Vec::<ScreenJob<Chunks>>::new(), None).await.unwrap();
    assert!(outcomes.is_empty());
}
