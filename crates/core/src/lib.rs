//! Symptom Trace Core
//!
//! Domain model, JSON extraction, and the stream event contract for the
//! Symptom Trace workspace. This crate has no dependencies on application
//! code (HTTP, database, LLM providers).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `json_extract` - Recovering JSON objects from free-form model output
//! - `model` - Symptoms, causal chains, suggestions, and their invariants
//! - `streaming` - Trace stream events and tool-call aggregation
//!
//! ## Design Principles
//!
//! 1. **Only serde/serde_json/thiserror** - keeps build times minimal
//! 2. **Validation at the boundary** - model output is checked here before any stage hands it on
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;
pub mod json_extract;
pub mod model;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── JSON Extraction ────────────────────────────────────────────────────
pub use json_extract::{extract_as, extract_json};

// ── Domain Model ───────────────────────────────────────────────────────
pub use model::{
    prepare_chains, prepare_suggestions, BodySystem, CausalChain, ChainConnection, ChainNode,
    Citation, ConnectionStrength, NodeType, ParsedSymptom, Severity, Suggestion,
    SymptomAnalysis, TemporalPattern, TraceResult, Urgency, DEEP_CHAIN_COUNT, MAX_TOOL_TURNS,
    SUGGESTION_COUNT,
};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{ToolCallEntry, ToolCallLog, ToolCallStatus, TraceStage, TraceStreamEvent};
