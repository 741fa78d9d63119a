//! Core Error Types
//!
//! Errors raised while recovering and validating structured data from model
//! output. These stay dependency-free (only thiserror + serde_json) so the
//! core crate remains lightweight; the application crate attaches the stage
//! that produced the output when converting them.

use thiserror::Error;

/// Core error type for the Symptom Trace workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The text contained no `{ ... }` span to parse
    #[error("No JSON object found in model output")]
    NoJsonObject,

    /// The candidate span was not valid JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// The JSON parsed but did not match the required shape
    #[error("Shape mismatch: {0}")]
    Shape(String),

    /// A domain invariant was violated
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a shape mismatch error
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
