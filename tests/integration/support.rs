//! Test doubles and fixtures

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use symptom_trace::services::persistence::{TraceArchive, TraceStore};
use symptom_trace::services::pipeline::{
    ChainBuilder, EventSink, QuickTrace, RecommendationStage, SymptomAnalyzer, TraceOrchestrator,
};
use symptom_trace::{AppError, AppResult};
use symptom_trace_core::{TraceResult, TraceStreamEvent};
use symptom_trace_llm::{
    LlmError, LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message, StopReason,
    ToolCall, ToolCallMode, ToolDefinition, UsageStats,
};
use symptom_trace_tools::{research_tool_definitions, ToolAdapter, ToolResult, SEARCH_TOOL};
use tokio::sync::mpsc;

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Scripted provider
// ============================================================================

pub enum Step {
    Respond(LlmResponse),
    Delay(Duration),
    Fail(LlmError),
}

/// What the provider saw on one call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tool_count: usize,
    pub tool_call_mode: ToolCallMode,
}

/// Replays a fixed list of steps, one per `send_message` call.
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn text(content: impl Into<String>) -> Arc<Self> {
        Self::new(vec![Step::Respond(text_response(content))])
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        _system: Option<String>,
        tools: Vec<ToolDefinition>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages,
            tool_count: tools.len(),
            tool_call_mode: request_options.tool_call_mode,
        });
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Err(LlmError::Other {
                    message: "delay elapsed".to_string(),
                })
            }
            Some(Step::Fail(e)) => Err(e),
            None => Err(LlmError::Other {
                message: "script exhausted".to_string(),
            }),
        }
    }
}

pub fn text_response(content: impl Into<String>) -> LlmResponse {
    LlmResponse {
        content: Some(content.into()),
        thinking: None,
        thinking_blocks: Vec::new(),
        tool_calls: Vec::new(),
        stop_reason: StopReason::EndTurn,
        usage: UsageStats::default(),
        model: "scripted-model".to_string(),
    }
}

pub fn thinking_response(thinking: &str, content: impl Into<String>) -> LlmResponse {
    LlmResponse {
        thinking: Some(thinking.to_string()),
        ..text_response(content)
    }
}

/// A turn requesting one search per query.
pub fn search_turn(turn: usize, queries: &[&str]) -> LlmResponse {
    LlmResponse {
        content: None,
        thinking: Some(format!("turn {} reasoning", turn)),
        thinking_blocks: Vec::new(),
        tool_calls: queries
            .iter()
            .enumerate()
            .map(|(i, q)| ToolCall {
                id: format!("call_{}_{}", turn, i),
                name: SEARCH_TOOL.to_string(),
                arguments: json!({ "query": q }),
            })
            .collect(),
        stop_reason: StopReason::ToolUse,
        usage: UsageStats::default(),
        model: "scripted-model".to_string(),
    }
}

// ============================================================================
// Stub tools
// ============================================================================

pub struct StubTools {
    executed: AtomicUsize,
    delay: Option<Duration>,
}

impl StubTools {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            executed: AtomicUsize::new(0),
            delay: None,
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            executed: AtomicUsize::new(0),
            delay: Some(delay),
        })
    }

    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolAdapter for StubTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        research_tool_definitions()
    }

    async fn execute(&self, name: &str, arguments: &serde_json::Value) -> ToolResult {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.executed.fetch_add(1, Ordering::SeqCst);
        ToolResult::ok(format!("{} results for {}", name, arguments))
    }
}

// ============================================================================
// Persistence doubles
// ============================================================================

#[derive(Default)]
pub struct RecordingArchive {
    pub fail: bool,
    pub saved: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl TraceArchive for RecordingArchive {
    fn name(&self) -> &str {
        "obsidian"
    }

    fn display_name(&self) -> &str {
        "Obsidian"
    }

    async fn save(&self, title: &str, document: &str) -> AppResult<()> {
        if self.fail {
            return Err(AppError::persistence("vault unreachable"));
        }
        self.saved
            .lock()
            .unwrap()
            .push((title.to_string(), document.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingStore {
    pub fail: bool,
    pub persisted: AtomicUsize,
}

#[async_trait]
impl TraceStore for RecordingStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn display_name(&self) -> &str {
        "database"
    }

    async fn persist(&self, _trace: &TraceResult, _document: &str) -> AppResult<String> {
        if self.fail {
            return Err(AppError::persistence("disk full"));
        }
        self.persisted.fetch_add(1, Ordering::SeqCst);
        Ok("trace-1".to_string())
    }
}

// ============================================================================
// Pipelines and event collection
// ============================================================================

pub struct DeepHarness {
    pub symptoms: Arc<ScriptedProvider>,
    pub chains: Arc<ScriptedProvider>,
    pub recommendations: Arc<ScriptedProvider>,
    pub tools: Arc<StubTools>,
}

impl DeepHarness {
    /// Every stage answers with its happy-path fixture.
    pub fn happy() -> Self {
        Self {
            symptoms: ScriptedProvider::text(symptoms_json()),
            chains: ScriptedProvider::new(vec![Step::Respond(thinking_response(
                "weighing iron loss against thyroid",
                chains_json(),
            ))]),
            recommendations: ScriptedProvider::text(suggestions_json()),
            tools: StubTools::new(),
        }
    }

    pub fn orchestrator(&self, timeout: Duration, max_turns: u32) -> TraceOrchestrator {
        TraceOrchestrator::new(
            SymptomAnalyzer::new(self.symptoms.clone(), timeout),
            ChainBuilder::new(self.chains.clone(), self.tools.clone(), timeout, max_turns),
            RecommendationStage::new(self.recommendations.clone(), timeout),
        )
    }
}

pub fn quick_trace(provider: Arc<ScriptedProvider>, timeout: Duration) -> QuickTrace {
    QuickTrace::new(provider, timeout)
}

/// Drain a receiver until it closes.
pub async fn collect(mut rx: mpsc::Receiver<TraceStreamEvent>) -> Vec<TraceStreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Run the deep pipeline to completion and return every event.
pub async fn run_deep(orchestrator: TraceOrchestrator, input: &str) -> Vec<TraceStreamEvent> {
    let (sink, rx) = EventSink::channel(64);
    let input = input.to_string();
    let handle = tokio::spawn(async move { orchestrator.run(&input, sink).await });
    let events = collect(rx).await;
    handle.await.unwrap();
    events
}

pub fn names(events: &[TraceStreamEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.event_name()).collect()
}

pub fn terminal_count(events: &[TraceStreamEvent]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}

// ============================================================================
// Fixtures
// ============================================================================

pub const COMPOUND_INPUT: &str =
    "I've been exhausted for three months, my hair is thinning and I crave ice constantly.";

pub fn symptoms_json() -> String {
    json!({
        "symptoms": [
            { "id": "s1", "text": "exhausted for three months", "bodySystem": "circulatory",
              "severity": "moderate", "temporalMarker": "three months", "isNewOnset": false },
            { "id": "s2", "text": "hair is thinning", "bodySystem": "integumentary",
              "severity": "mild", "isNewOnset": true },
            { "id": "s3", "text": "craves ice", "bodySystem": "gastrointestinal",
              "severity": "mild" }
        ],
        "environmentalFactors": ["vegetarian diet"],
        "temporalPattern": "gradual",
        "rawInput": "model echo that must be replaced"
    })
    .to_string()
}

fn chain_value(id: &str, label: &str, confidence: f64) -> serde_json::Value {
    json!({
        "id": id,
        "label": label,
        "overallConfidence": confidence,
        "nodes": [
            { "id": format!("{}-n1", id), "type": "symptom", "title": "Fatigue",
              "description": "Persistent tiredness", "bodySystem": "circulatory",
              "confidence": 0.9, "patientEvidence": "exhausted for three months" },
            { "id": format!("{}-n2", id), "type": "mechanism", "title": "Reduced oxygen delivery",
              "description": "Less haemoglobin carries less oxygen", "bodySystem": "circulatory",
              "confidence": 0.7 },
            { "id": format!("{}-n3", id), "type": "root-cause", "title": label,
              "description": "Underlying cause", "bodySystem": "endocrine",
              "confidence": 0.6,
              "citations": [{ "title": "Iron and fatigue", "source": "PubMed" }] }
        ],
        "connections": [
            { "fromNodeId": format!("{}-n1", id), "toNodeId": format!("{}-n2", id),
              "mechanism": "tissue hypoxia", "strength": "strong" },
            // Reversed on purpose; the pipeline normalizes it.
            { "fromNodeId": format!("{}-n3", id), "toNodeId": format!("{}-n2", id),
              "mechanism": "impaired erythropoiesis", "strength": "moderate" }
        ]
    })
}

pub fn chains_json() -> String {
    let body = json!({
        "chains": [
            chain_value("chain-thyroid", "Hypothyroidism", 0.55),
            chain_value("chain-iron", "Iron deficiency", 0.85)
        ],
        "summary": "Fatigue, hair thinning and pica point most strongly to iron deficiency."
    });
    format!("Here is my analysis:\n```json\n{}\n```", body)
}

pub fn suggestions_json() -> String {
    json!({
        "suggestions": [
            { "text": "Eat iron-rich foods with vitamin C", "forDoctor": false, "urgency": "info" },
            { "text": "Ask about a ferritin test", "forDoctor": true, "urgency": "discuss" },
            { "text": "Seek care for chest pain or fainting", "forDoctor": false, "urgency": "urgent" },
            { "text": "Track energy levels daily", "forDoctor": false, "urgency": "info" }
        ]
    })
    .to_string()
}

pub fn quick_json() -> String {
    json!({
        "chain": chain_value("quick-1", "Iron deficiency", 0.8),
        "summary": "Iron deficiency is the most likely thread.",
        "suggestions": [
            { "text": "Try a food diary", "forDoctor": false, "urgency": "info" },
            { "text": "Request a full blood count", "forDoctor": true, "urgency": "discuss" },
            { "text": "Get help if short of breath at rest", "forDoctor": false, "urgency": "urgent" }
        ]
    })
    .to_string()
}
