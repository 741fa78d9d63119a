//! Persistence Integration Tests
//!
//! Archive and store behaviour once a deep trace has completed.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use symptom_trace::services::persistence::SqliteTraceStore;
use symptom_trace::Database;
use symptom_trace_core::{TraceStage, TraceStreamEvent};

use crate::support::*;

fn saving_sinks(events: &[TraceStreamEvent]) -> Vec<Vec<String>> {
    events
        .iter()
        .filter_map(|e| match e {
            TraceStreamEvent::Status {
                stage: TraceStage::Saving,
                sinks,
                ..
            } => Some(sinks.clone().unwrap_or_default()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_archive_and_store_receive_completed_trace() {
    let harness = DeepHarness::happy();
    let archive = Arc::new(RecordingArchive::default());
    let store = Arc::new(RecordingStore::default());
    let orchestrator = harness
        .orchestrator(TEST_TIMEOUT, 5)
        .with_archive(archive.clone())
        .with_store(store.clone());

    let events = run_deep(orchestrator, COMPOUND_INPUT).await;

    assert_eq!(
        saving_sinks(&events),
        vec![vec!["obsidian".to_string()], vec!["sqlite".to_string()]]
    );
    assert_eq!(
        events.last(),
        Some(&TraceStreamEvent::Done {
            success: true,
            trace_id: Some("trace-1".to_string()),
        })
    );

    let saved = archive.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0, "exhausted for three months, hair is thinning, craves ice");
    assert!(saved[0].1.contains("Iron deficiency"));
    assert_eq!(store.persisted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_persistence_failures_still_complete() {
    let harness = DeepHarness::happy();
    let orchestrator = harness
        .orchestrator(TEST_TIMEOUT, 5)
        .with_archive(Arc::new(RecordingArchive {
            fail: true,
            ..Default::default()
        }))
        .with_store(Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        }));

    let events = run_deep(orchestrator, COMPOUND_INPUT).await;

    assert!(!names(&events).contains(&"error"));
    assert_eq!(terminal_count(&events), 1);
    assert_eq!(
        events.last(),
        Some(&TraceStreamEvent::Done {
            success: true,
            trace_id: None,
        })
    );
}

#[tokio::test]
async fn test_sqlite_store_round_trip() {
    let db = Database::new_in_memory().unwrap();
    let harness = DeepHarness::happy();
    let orchestrator = harness
        .orchestrator(TEST_TIMEOUT, 5)
        .with_store(Arc::new(SqliteTraceStore::new(db.clone())));

    let events = run_deep(orchestrator, COMPOUND_INPUT).await;
    let Some(TraceStreamEvent::Done {
        trace_id: Some(id), ..
    }) = events.last()
    else {
        panic!("expected done with a trace id, got {:?}", events.last());
    };

    let stored = db.get_trace(id).unwrap().expect("stored trace");
    assert_eq!(stored.input_text, COMPOUND_INPUT);
    assert_eq!(stored.chains.len(), 2);
    assert_eq!(stored.chains[0].id, "chain-iron");
    assert_eq!(stored.suggestions.len(), 4);
    assert!(stored.thinking.contains("iron loss"));

    let listed = db.list_traces(10).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, *id);
}

#[tokio::test]
async fn test_failed_trace_persists_nothing() {
    let store = Arc::new(RecordingStore::default());
    let harness = DeepHarness {
        recommendations: ScriptedProvider::text("no suggestions today"),
        ..DeepHarness::happy()
    };
    let orchestrator = harness.orchestrator(TEST_TIMEOUT, 5).with_store(store.clone());

    let events = run_deep(orchestrator, COMPOUND_INPUT).await;

    assert!(matches!(events.last(), Some(TraceStreamEvent::Error { .. })));
    assert!(saving_sinks(&events).is_empty());
    assert_eq!(store.persisted.load(Ordering::SeqCst), 0);
}
