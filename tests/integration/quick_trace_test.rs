//! Quick-Trace Integration Tests

use std::time::Duration;

use symptom_trace::services::pipeline::EventSink;
use symptom_trace_core::{TraceStage, TraceStreamEvent, Urgency};

use crate::support::*;

async fn run_quick(provider: std::sync::Arc<ScriptedProvider>, timeout: Duration) -> Vec<TraceStreamEvent> {
    let quick = quick_trace(provider, timeout);
    let (sink, rx) = EventSink::channel(64);
    let handle = tokio::spawn(async move { quick.run("tired and dizzy", sink).await });
    let events = collect(rx).await;
    handle.await.unwrap();
    events
}

#[tokio::test]
async fn test_quick_trace_emits_one_chain_then_done() {
    let provider = ScriptedProvider::text(quick_json());
    let events = run_quick(provider.clone(), TEST_TIMEOUT).await;

    assert_eq!(
        names(&events),
        vec![
            "status",
            "status",
            "chain",
            "summary",
            "status",
            "suggestions",
            "done",
        ]
    );
    assert_eq!(
        events.last(),
        Some(&TraceStreamEvent::Done {
            success: true,
            trace_id: None,
        })
    );

    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tool_count, 0);

    let TraceStreamEvent::Suggestions { suggestions } = &events[5] else {
        panic!("expected suggestions");
    };
    assert_eq!(suggestions[0].urgency, Urgency::Urgent);
}

#[tokio::test]
async fn test_quick_trace_never_emits_symptoms_or_saving() {
    let events = run_quick(ScriptedProvider::text(quick_json()), TEST_TIMEOUT).await;

    assert!(!names(&events).contains(&"symptoms"));
    assert!(!events.iter().any(|e| matches!(
        e,
        TraceStreamEvent::Status {
            stage: TraceStage::Saving,
            ..
        }
    )));
}

#[tokio::test]
async fn test_quick_trace_malformed_output_is_single_error() {
    let events = run_quick(ScriptedProvider::text("{\"chain\": 42}"), TEST_TIMEOUT).await;

    assert_eq!(names(&events), vec!["status", "status", "error"]);
    assert_eq!(terminal_count(&events), 1);
}

#[tokio::test]
async fn test_quick_trace_timeout() {
    let provider = ScriptedProvider::new(vec![Step::Delay(Duration::from_secs(10))]);
    let events = run_quick(provider, Duration::from_millis(50)).await;

    assert_eq!(names(&events), vec!["status", "error"]);
    let TraceStreamEvent::Error { message } = &events[1] else {
        panic!("expected error");
    };
    assert!(message.to_lowercase().contains("timeout"), "message: {}", message);
}
