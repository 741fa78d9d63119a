//! Trace Endpoint
//!
//! `POST /trace` validates the body, starts the selected pipeline, and
//! relays its events as server-sent events. The HTTP status is 200 once
//! streaming begins; failures after that arrive as an `error` event.

use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use symptom_trace_core::TraceStreamEvent;
use tokio_stream::wrappers::ReceiverStream;

use crate::models::response::TraceRequest;
use crate::state::AppState;

pub const MISSING_INPUT: &str = "Missing inputText";

/// `POST /trace`
pub async fn start_trace(State(state): State<AppState>, body: Bytes) -> Response {
    let request: TraceRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("[Trace] rejected body: {}", e);
            return (StatusCode::BAD_REQUEST, format!("Invalid JSON body: {}", e)).into_response();
        }
    };

    let Some(input_text) = request.input() else {
        return (StatusCode::BAD_REQUEST, MISSING_INPUT).into_response();
    };

    let mode = request.mode();
    tracing::info!(
        "[Trace] starting {:?} trace ({} chars)",
        mode,
        input_text.chars().count()
    );

    let rx = state.traces.start(input_text.to_string(), mode);
    let stream = ReceiverStream::new(rx).filter_map(|event| async move { to_sse_event(&event) });

    (
        [(header::CACHE_CONTROL, "no-cache")],
        Sse::new(stream.map(Ok::<_, Infallible>)).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

fn to_sse_event(event: &TraceStreamEvent) -> Option<Event> {
    match event.payload() {
        Ok(data) => Some(Event::default().event(event.event_name()).data(data.to_string())),
        Err(e) => {
            tracing::error!("[Trace] dropping unserializable {} event: {}", event.event_name(), e);
            None
        }
    }
}
