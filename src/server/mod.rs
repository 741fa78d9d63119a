//! HTTP Surface
//!
//! Routes served by the axum application. `POST /trace` is the only entry
//! point into the pipelines; the rest report health and read stored traces.

pub mod health;
pub mod history;
pub mod trace;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

pub use health::*;
pub use history::*;
pub use trace::*;

/// Build the application router over shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::get_health))
        .route("/trace", post(trace::start_trace))
        .route("/traces", get(history::list_traces))
        .route("/traces/:id", get(history::get_trace))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
