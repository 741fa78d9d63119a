//! Quick-Trace Pipeline
//!
//! A single model call producing one chain, a summary, and suggestions.
//! No tools, no turns, nothing persisted. Speaks the same event vocabulary
//! as the deep pipeline and ends with exactly one terminal event.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use symptom_trace_core::{
    extract_as, prepare_chains, prepare_suggestions, CausalChain, CoreError, Suggestion,
    SymptomAnalysis, TraceResult, TraceStage, TraceStreamEvent, SUGGESTION_COUNT,
};
use symptom_trace_llm::{LlmProvider, LlmRequestOptions, Message};

use super::call::call_model;
use super::events::EventSink;
use super::prompts::QUICK_TRACE_PROMPT;
use crate::utils::error::{AppError, AppResult};

#[derive(Deserialize)]
struct QuickPayload {
    chain: CausalChain,
    summary: String,
    suggestions: Vec<Suggestion>,
}

pub struct QuickTrace {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl QuickTrace {
    pub fn new(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Run a quick trace, closing the stream with `done` or `error`.
    pub async fn run(&self, input_text: &str, sink: EventSink) -> Option<TraceResult> {
        match self.execute(input_text, &sink).await {
            Ok(result) => {
                let done = TraceStreamEvent::Done {
                    success: true,
                    trace_id: None,
                };
                sink.emit(done).await.ok().map(|_| result)
            }
            Err(AppError::Cancelled) => {
                tracing::info!("[QuickTrace] client disconnected");
                None
            }
            Err(e) => {
                if e.is_fatal() {
                    tracing::error!("[QuickTrace] failed: {}", e);
                } else {
                    tracing::warn!("[QuickTrace] aborted: {}", e);
                }
                let _ = sink.emit(TraceStreamEvent::error(e.to_string())).await;
                None
            }
        }
    }

    async fn execute(&self, input_text: &str, sink: &EventSink) -> AppResult<TraceResult> {
        sink.emit(TraceStreamEvent::status(
            TraceStage::Symptoms,
            "Analyzing symptoms...",
        ))
        .await?;

        let response = call_model(
            self.provider.as_ref(),
            sink,
            TraceStage::Chains,
            self.timeout,
            QUICK_TRACE_PROMPT,
            vec![Message::user(input_text)],
            Vec::new(),
            LlmRequestOptions::default(),
        )
        .await?;

        sink.emit(TraceStreamEvent::status(
            TraceStage::Chains,
            "Building causal chain...",
        ))
        .await?;

        let text = response.content.unwrap_or_default();
        let payload: QuickPayload =
            extract_as(&text).map_err(|e| AppError::malformed(TraceStage::Chains, e))?;
        if payload.summary.trim().is_empty() {
            return Err(AppError::malformed(
                TraceStage::Chains,
                CoreError::shape("summary is empty"),
            ));
        }
        let chains = prepare_chains(vec![payload.chain], 1..=1)
            .map_err(|e| AppError::malformed(TraceStage::Chains, e))?;
        let suggestions = prepare_suggestions(payload.suggestions, SUGGESTION_COUNT)
            .map_err(|e| AppError::malformed(TraceStage::Recommendations, e))?;

        for chain in &chains {
            sink.emit(TraceStreamEvent::Chain {
                chain: chain.clone(),
            })
            .await?;
        }
        sink.emit(TraceStreamEvent::Summary {
            content: payload.summary.clone(),
        })
        .await?;
        sink.emit(TraceStreamEvent::status(
            TraceStage::Recommendations,
            "Finalizing...",
        ))
        .await?;
        sink.emit(TraceStreamEvent::Suggestions {
            suggestions: suggestions.clone(),
        })
        .await?;

        Ok(TraceResult {
            symptoms: SymptomAnalysis::unparsed(input_text),
            chains,
            summary: payload.summary,
            suggestions,
            thinking: response.thinking.unwrap_or_default(),
        })
    }
}
