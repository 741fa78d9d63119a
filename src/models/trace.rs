//! Stored Trace Models
//!
//! Rows read back from the trace store.

use serde::{Deserialize, Serialize};
use symptom_trace_core::{CausalChain, Suggestion};

/// One line of trace history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSummary {
    pub id: String,
    pub input_text: String,
    pub summary: String,
    pub created_at: String,
}

/// A persisted trace with its chains and suggestions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTrace {
    pub id: String,
    pub input_text: String,
    pub thinking: String,
    pub chains: Vec<CausalChain>,
    pub summary: String,
    pub suggestions: Vec<Suggestion>,
    /// Markdown archival document
    pub document: String,
    pub created_at: String,
}
