//! HTTP Integration Tests
//!
//! Routes exercised through `tower::ServiceExt::oneshot` against the real
//! router, with scripted providers behind the pipelines.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use symptom_trace::models::settings::AppConfig;
use symptom_trace::services::persistence::SqliteTraceStore;
use symptom_trace::{router, AppState, Database, TraceService};
use symptom_trace_core::{ToolCallLog, TraceStreamEvent};
use std::sync::Arc;
use tower::ServiceExt;

use crate::support::*;

fn app_with(harness: &DeepHarness, quick: Arc<ScriptedProvider>, db: Option<Database>) -> axum::Router {
    let mut orchestrator = harness.orchestrator(TEST_TIMEOUT, 5);
    if let Some(db) = &db {
        orchestrator = orchestrator.with_store(Arc::new(SqliteTraceStore::new(db.clone())));
    }
    let service = TraceService::new(orchestrator, quick_trace(quick, TEST_TIMEOUT), 64);
    router(AppState::new(AppConfig::default(), db, service))
}

fn app() -> axum::Router {
    app_with(&DeepHarness::happy(), ScriptedProvider::text(quick_json()), None)
}

fn post_trace(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/trace")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Split an SSE body into events, skipping keep-alive comments.
fn parse_sse(body: &str) -> Vec<TraceStreamEvent> {
    body.split("\n\n")
        .filter_map(|frame| {
            let mut event = None;
            let mut data = None;
            for line in frame.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(payload) = line.strip_prefix("data:") {
                    data = Some(payload.trim().to_string());
                }
            }
            Some(TraceStreamEvent::from_sse(&event?, &data?).unwrap())
        })
        .collect()
}

// ============================================================================
// POST /trace
// ============================================================================

#[tokio::test]
async fn test_missing_input_text_is_400() {
    let response = app()
        .oneshot(post_trace(json!({ "mode": "quick" }).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response).await, "Missing inputText");
}

#[tokio::test]
async fn test_blank_input_text_is_400() {
    let response = app()
        .oneshot(post_trace(json!({ "inputText": "   " }).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_json_is_400() {
    let response = app().oneshot(post_trace("{not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deep_trace_streams_sse() {
    let response = app()
        .oneshot(post_trace(json!({ "inputText": COMPOUND_INPUT }).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    let body = body_string(response).await;
    assert!(body.starts_with("event: status\ndata: "), "body: {}", body);

    let events = parse_sse(&body);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(matches!(events.last(), Some(TraceStreamEvent::Done { .. })));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, TraceStreamEvent::Chain { .. }))
            .count(),
        2
    );
}

#[tokio::test]
async fn test_quick_mode_selects_quick_pipeline() {
    let harness = DeepHarness::happy();
    let app = app_with(&harness, ScriptedProvider::text(quick_json()), None);

    let response = app
        .oneshot(post_trace(
            json!({ "inputText": "tired", "mode": "quick" }).to_string(),
        ))
        .await
        .unwrap();
    let events = parse_sse(&body_string(response).await);

    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, TraceStreamEvent::Chain { .. }))
            .count(),
        1
    );
    assert!(matches!(events.last(), Some(TraceStreamEvent::Done { .. })));
    assert!(harness.symptoms.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_mode_runs_deep_pipeline() {
    let harness = DeepHarness::happy();
    let app = app_with(&harness, ScriptedProvider::text(quick_json()), None);

    let response = app
        .oneshot(post_trace(
            json!({ "inputText": "tired", "mode": "thorough" }).to_string(),
        ))
        .await
        .unwrap();
    let events = parse_sse(&body_string(response).await);

    assert!(events
        .iter()
        .any(|e| matches!(e, TraceStreamEvent::Symptoms { .. })));
    assert_eq!(harness.symptoms.calls().len(), 1);
}

#[tokio::test]
async fn test_stage_failure_arrives_as_error_event_with_200() {
    let harness = DeepHarness {
        symptoms: ScriptedProvider::text("nothing useful"),
        ..DeepHarness::happy()
    };
    let app = app_with(&harness, ScriptedProvider::text(quick_json()), None);

    let response = app
        .oneshot(post_trace(json!({ "inputText": "headache" }).to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let events = parse_sse(&body_string(response).await);
    assert!(matches!(events.last(), Some(TraceStreamEvent::Error { .. })));
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_tool_activity_aggregates_from_stream() {
    let harness = DeepHarness {
        chains: ScriptedProvider::new(vec![
            Step::Respond(search_turn(1, &["ferritin"])),
            Step::Respond(text_response(chains_json())),
        ]),
        ..DeepHarness::happy()
    };
    let app = app_with(&harness, ScriptedProvider::text(quick_json()), None);

    let response = app
        .oneshot(post_trace(json!({ "inputText": COMPOUND_INPUT }).to_string()))
        .await
        .unwrap();
    let events = parse_sse(&body_string(response).await);

    let mut log = ToolCallLog::new();
    for event in &events {
        log.apply(event);
    }
    assert_eq!(log.entries().len(), 1);
    assert_eq!(log.entries()[0].input, "ferritin");
    assert!(!log.has_pending());
}

// ============================================================================
// Health and history
// ============================================================================

#[tokio::test]
async fn test_health_reports_database() {
    let db = Database::new_in_memory().unwrap();
    let app = app_with(
        &DeepHarness::happy(),
        ScriptedProvider::text(quick_json()),
        Some(db),
    );

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(health["ok"], true);
    assert_eq!(health["database"], true);
}

#[tokio::test]
async fn test_stored_trace_is_listed_and_fetchable() {
    let db = Database::new_in_memory().unwrap();
    let app = app_with(
        &DeepHarness::happy(),
        ScriptedProvider::text(quick_json()),
        Some(db),
    );

    let response = app
        .clone()
        .oneshot(post_trace(json!({ "inputText": COMPOUND_INPUT }).to_string()))
        .await
        .unwrap();
    let events = parse_sse(&body_string(response).await);
    let Some(TraceStreamEvent::Done {
        trace_id: Some(id), ..
    }) = events.last()
    else {
        panic!("expected done with trace id");
    };

    let response = app
        .clone()
        .oneshot(Request::get("/traces?limit=5").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], id.as_str());
    assert_eq!(listed[0]["inputText"], COMPOUND_INPUT);

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/traces/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stored: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(stored["chains"].as_array().unwrap().len(), 2);

    let response = app
        .oneshot(Request::get("/traces/unknown").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stored_input_keeps_original_text() {
    let db = Database::new_in_memory().unwrap();
    let app = app_with(
        &DeepHarness::happy(),
        ScriptedProvider::text(quick_json()),
        Some(db.clone()),
    );
    let padded = "  My legs and back hurt\n";

    let response = app
        .oneshot(post_trace(json!({ "inputText": padded }).to_string()))
        .await
        .unwrap();
    let events = parse_sse(&body_string(response).await);
    let Some(TraceStreamEvent::Done {
        trace_id: Some(id), ..
    }) = events.last()
    else {
        panic!("expected done with trace id");
    };

    let stored = db.get_trace(id).unwrap().expect("stored trace");
    assert_eq!(stored.input_text, padded);
}

#[tokio::test]
async fn test_history_without_database_is_503() {
    let response = app()
        .oneshot(Request::get("/traces").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
