//! Request/Response Types
//!
//! Bodies accepted and returned by the HTTP surface.

use serde::{Deserialize, Serialize};

/// Which pipeline runs a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceMode {
    #[default]
    Deep,
    Quick,
}

impl TraceMode {
    /// Anything other than `"quick"` (including nothing) selects the deep pipeline.
    pub fn parse(mode: Option<&str>) -> Self {
        match mode {
            Some("quick") => TraceMode::Quick,
            _ => TraceMode::Deep,
        }
    }
}

/// `POST /trace` body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRequest {
    #[serde(default)]
    pub input_text: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

impl TraceRequest {
    /// The input text exactly as supplied, unless missing or blank
    pub fn input(&self) -> Option<&str> {
        self.input_text
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    pub fn mode(&self) -> TraceMode {
        TraceMode::parse(self.mode.as_deref())
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub message: String,
    pub version: String,
    pub database: bool,
}

impl HealthResponse {
    pub fn new(database: bool) -> Self {
        Self {
            ok: database,
            message: if database {
                "symptom-trace is running".to_string()
            } else {
                "database unavailable".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
        }
    }
}

/// JSON error body for non-streaming failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
