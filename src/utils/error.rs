//! Error Handling
//!
//! Unified error types for the application.
//! Uses thiserror for ergonomic error definitions.
//!
//! `StageFailure` and `MalformedOutput` abort a trace. `ToolFailure` never
//! leaves the tool loop and `Persistence` never reaches the stream.

use symptom_trace_core::{CoreError, TraceStage};
use symptom_trace_llm::LlmError;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// An external call made by a stage failed (network, timeout, non-2xx)
    #[error("{stage} stage failed: {message}")]
    StageFailure { stage: TraceStage, message: String },

    /// Model output did not parse or did not match the required shape
    #[error("{stage} stage returned malformed output: {message}")]
    MalformedOutput { stage: TraceStage, message: String },

    /// A research tool call failed
    #[error("Tool error: {0}")]
    ToolFailure(String),

    /// Archive or store write failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// The stream consumer went away
    #[error("Trace cancelled: client disconnected")]
    Cancelled,
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a stage failure from a failed model call
    pub fn stage(stage: TraceStage, err: LlmError) -> Self {
        Self::StageFailure {
            stage,
            message: err.to_string(),
        }
    }

    /// Create a malformed-output error from an extraction or validation failure
    pub fn malformed(stage: TraceStage, err: CoreError) -> Self {
        Self::MalformedOutput {
            stage,
            message: err.to_string(),
        }
    }

    /// Create a tool error
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::ToolFailure(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Whether this error ends a trace with an `error` event
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StageFailure { .. } | Self::MalformedOutput { .. }
        )
    }
}

impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
