use std::sync::Arc;

use chrono::Utc;
use common::{JudgeStatus, ProgressEvent};
use judge_relay::ingest::{IngestOutcome, JudgeResultIngestor};
use judge_relay::store::{RecordOutcome, ResultStore, TerminalRecord};

use crate::common::{case_event, code, db_store, end_event};

fn record(submission_id: &str, status: JudgeStatus, time: Option<u64>) -> TerminalRecord {
    TerminalRecord {
        submission_id: submission_id.into(),
        status,
        score: Some(100),
        time,
        memory: Some(65_536),
        compile_error: None,
        runtime_error: None,
        judged_at: Utc::now(),
    }
}

fn event(value: serde_json::Value) -> ProgressEvent {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn first_write_wins() {
    let store = db_store().await;

    let first = record("sub1", JudgeStatus::Accepted, Some(120));
    let outcome = store.record_terminal_result(first.clone()).await.unwrap();
    assert_eq!(outcome, RecordOutcome::Recorded);

    let conflicting = record("sub1", JudgeStatus::WrongAnswer, Some(999));
    let outcome = store.record_terminal_result(conflicting).await.unwrap();
    let RecordOutcome::AlreadyRecorded(existing) = outcome else {
        panic!("expected the existing row, got {outcome:?}");
    };
    assert!(existing.same_outcome(&first));

    let stored = store.find_result("sub1").await.unwrap().unwrap();
    assert_eq!(stored.status, JudgeStatus::Accepted);
    assert_eq!(stored.time, Some(120));
}

#[tokio::test]
async fn stored_result_keeps_every_field() {
    let store = db_store().await;

    let mut failed = record("sub2", JudgeStatus::CompileError, None);
    failed.score = None;
    failed.memory = Some(i64::MAX as u64);
    failed.compile_error = Some("main.cpp:1:1: error: 'x' was not declared".into());
    store.record_terminal_result(failed.clone()).await.unwrap();

    let stored = store.find_result("sub2").await.unwrap().unwrap();
    assert!(stored.same_outcome(&failed));
    assert_eq!(stored.time, None);
    assert_eq!(stored.memory, Some(i64::MAX as u64));
}

#[tokio::test]
async fn missing_result_is_none() {
    let store = db_store().await;
    assert!(store.find_result("never-judged").await.unwrap().is_none());
}

#[tokio::test]
async fn ingestor_persists_aggregated_result_once() {
    let store = Arc::new(db_store().await);
    let ingestor = JudgeResultIngestor::new(store.clone());

    for (case_id, time) in [(1, 40), (2, 60)] {
        let case = event(case_event("sub3", case_id, code::ACCEPTED, time, 1024));
        ingestor.ingest(case).await.unwrap();
    }
    let mut end = event(end_event("sub3", code::ACCEPTED, 0, 0));
    end.time = None;
    end.memory = None;

    let outcome = ingestor.ingest(end.clone()).await.unwrap();
    assert!(matches!(outcome, IngestOutcome::Recorded { .. }));
    let stored = store.find_result("sub3").await.unwrap().unwrap();
    assert_eq!(stored.time, Some(100));
    assert_eq!(stored.memory, Some(1024));

    let outcome = ingestor.ingest(end).await.unwrap();
    assert_eq!(
        outcome,
        IngestOutcome::Duplicate {
            status: JudgeStatus::Accepted
        }
    );
}
