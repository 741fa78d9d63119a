//! Trace History
//!
//! Read access to traces the store has persisted.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::models::response::ErrorResponse;
use crate::models::trace::{StoredTrace, TraceSummary};
use crate::state::AppState;
use crate::storage::database::Database;
use crate::utils::error::{AppError, AppResult};

pub const DEFAULT_LIST_LIMIT: u32 = 20;
pub const MAX_LIST_LIMIT: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

/// Error body for the history routes
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("[History] {}", self.0);
        }
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

/// `GET /traces?limit=N`, newest first
pub async fn list_traces(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TraceSummary>>, ApiError> {
    let db = require_database(&state)?;
    let limit = query.effective_limit();
    let traces = blocking(move || db.list_traces(limit)).await?;
    Ok(Json(traces))
}

/// `GET /traces/:id`
pub async fn get_trace(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredTrace>, ApiError> {
    let db = require_database(&state)?;
    let lookup = id.clone();
    match blocking(move || db.get_trace(&lookup)).await? {
        Some(trace) => Ok(Json(trace)),
        None => Err(AppError::not_found(format!("Trace {} not found", id)).into()),
    }
}

fn require_database(state: &AppState) -> AppResult<Database> {
    state
        .database
        .clone()
        .ok_or_else(|| AppError::config("Trace storage is not available"))
}

async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::persistence(format!("storage task failed: {}", e)))?
}
