//! Trace Stream Events
//!
//! The typed event vocabulary that crosses the pipeline/caller boundary.
//! Both the deep and the quick pipeline emit these; the HTTP layer renders
//! each one as a server-sent event frame (`event: <name>\ndata: <json>\n\n`).

use serde::{Deserialize, Serialize};

use crate::model::{CausalChain, ParsedSymptom, Suggestion, TemporalPattern};

/// Pipeline stage named by a `status` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStage {
    Symptoms,
    Chains,
    Recommendations,
    Saving,
    Complete,
}

impl std::fmt::Display for TraceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TraceStage::Symptoms => "symptoms",
            TraceStage::Chains => "chains",
            TraceStage::Recommendations => "recommendations",
            TraceStage::Saving => "saving",
            TraceStage::Complete => "complete",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Calling,
    Done,
}

/// One event on a trace stream.
///
/// Serialized adjacently tagged so the tag maps onto the SSE event name and
/// the content onto the SSE data line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum TraceStreamEvent {
    Status {
        stage: TraceStage,
        message: String,
        /// Collaborators being written to (saving stage only)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sinks: Option<Vec<String>>,
    },

    Thinking {
        content: String,
    },

    ToolCall {
        tool: String,
        #[serde(rename = "displayName")]
        display_name: String,
        input: String,
        status: ToolCallStatus,
    },

    Symptoms {
        symptoms: Vec<ParsedSymptom>,
        #[serde(rename = "environmentalFactors")]
        environmental_factors: Vec<String>,
        #[serde(rename = "temporalPattern", default, skip_serializing_if = "Option::is_none")]
        temporal_pattern: Option<TemporalPattern>,
    },

    Chain {
        chain: CausalChain,
    },

    Summary {
        content: String,
    },

    Suggestions {
        suggestions: Vec<Suggestion>,
    },

    Done {
        success: bool,
        #[serde(rename = "traceId", default, skip_serializing_if = "Option::is_none")]
        trace_id: Option<String>,
    },

    Error {
        message: String,
    },
}

impl TraceStreamEvent {
    pub fn status(stage: TraceStage, message: impl Into<String>) -> Self {
        Self::Status {
            stage,
            message: message.into(),
            sinks: None,
        }
    }

    pub fn saving(message: impl Into<String>, sinks: &[&str]) -> Self {
        Self::Status {
            stage: TraceStage::Saving,
            message: message.into(),
            sinks: Some(sinks.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// SSE event name for this variant.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Thinking { .. } => "thinking",
            Self::ToolCall { .. } => "tool_call",
            Self::Symptoms { .. } => "symptoms",
            Self::Chain { .. } => "chain",
            Self::Summary { .. } => "summary",
            Self::Suggestions { .. } => "suggestions",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// `done` and `error` close a stream; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// JSON payload carried on the SSE data line.
    pub fn payload(&self) -> serde_json::Result<serde_json::Value> {
        let mut tagged = serde_json::to_value(self)?;
        Ok(tagged
            .get_mut("data")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null))
    }

    /// Render as one complete server-sent event frame.
    pub fn to_sse_frame(&self) -> serde_json::Result<String> {
        let data = serde_json::to_string(&self.payload()?)?;
        Ok(format!("event: {}\ndata: {}\n\n", self.event_name(), data))
    }

    /// Rebuild an event from an SSE name and data line.
    pub fn from_sse(event: &str, data: &str) -> serde_json::Result<Self> {
        let data: serde_json::Value = serde_json::from_str(data)?;
        serde_json::from_value(serde_json::json!({ "event": event, "data": data }))
    }
}

/// Client-side view of tool activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallEntry {
    pub tool: String,
    pub display_name: String,
    pub input: String,
    pub status: ToolCallStatus,
}

/// Aggregates `tool_call` events keyed on `(tool, input)`.
///
/// A later event for a known key replaces the earlier entry in place, so a
/// `calling` entry turns into `done` without moving.
#[derive(Debug, Clone, Default)]
pub struct ToolCallLog {
    entries: Vec<ToolCallEntry>,
}

impl ToolCallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the log. Non-tool events are ignored.
    pub fn apply(&mut self, event: &TraceStreamEvent) {
        let TraceStreamEvent::ToolCall {
            tool,
            display_name,
            input,
            status,
        } = event
        else {
            return;
        };

        let entry = ToolCallEntry {
            tool: tool.clone(),
            display_name: display_name.clone(),
            input: input.clone(),
            status: *status,
        };
        match self
            .entries
            .iter_mut()
            .find(|e| e.tool == entry.tool && e.input == entry.input)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn entries(&self) -> &[ToolCallEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True while any call has not reported `done`.
    pub fn has_pending(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.status == ToolCallStatus::Calling)
    }
}
