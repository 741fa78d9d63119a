//! Causal Chain Builder Stage
//!
//! Multi-turn model exchange with a bounded tool-use loop. Each turn may
//! request research tools; results are fed back as the next user turn until
//! the model answers in text or the turn budget runs out.
//!
//! On the last permitted turn the tools stay declared but tool choice is
//! `none`, and the preceding tool results carry an instruction to answer
//! from what has been gathered. Tool requests on that turn are ignored.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use symptom_trace_core::{
    extract_as, prepare_chains, CausalChain, CoreError, SymptomAnalysis, ToolCallStatus,
    TraceStage, TraceStreamEvent, DEEP_CHAIN_COUNT, MAX_TOOL_TURNS,
};
use symptom_trace_llm::{
    LlmProvider, LlmRequestOptions, LlmResponse, Message, MessageContent, ToolCall, ToolCallMode,
};
use symptom_trace_tools::ToolAdapter;

use super::call::{call_model, call_tool};
use super::events::EventSink;
use super::prompts::{chain_user_prompt, CAUSAL_CHAIN_PROMPT, FINAL_TURN_NUDGE};
use crate::utils::error::{AppError, AppResult};

/// What the chain builder hands to the next stage
#[derive(Debug, Clone)]
pub struct ChainBuildOutput {
    /// Validated chains, highest confidence first
    pub chains: Vec<CausalChain>,
    pub summary: String,
    /// Reasoning from every turn, in turn order
    pub thinking: String,
    /// Model turns used
    pub turns: u32,
}

#[derive(Deserialize)]
struct ChainPayload {
    chains: Vec<CausalChain>,
    summary: String,
}

pub struct ChainBuilder {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<dyn ToolAdapter>,
    timeout: Duration,
    max_turns: u32,
}

impl ChainBuilder {
    /// `max_turns` is clamped to `1..=MAX_TOOL_TURNS`.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<dyn ToolAdapter>,
        timeout: Duration,
        max_turns: u32,
    ) -> Self {
        Self {
            provider,
            tools,
            timeout,
            max_turns: max_turns.clamp(1, MAX_TOOL_TURNS),
        }
    }

    pub async fn build(
        &self,
        analysis: &SymptomAnalysis,
        sink: &EventSink,
    ) -> AppResult<ChainBuildOutput> {
        let stage = TraceStage::Chains;
        let definitions = self.tools.definitions();
        let mut messages = vec![Message::user(chain_user_prompt(analysis)?)];
        let mut thinking = String::new();
        let mut turn = 0;

        let last_response: LlmResponse = loop {
            turn += 1;
            let last_turn = turn >= self.max_turns;
            let mode = if last_turn {
                ToolCallMode::None
            } else {
                ToolCallMode::Auto
            };

            let response = call_model(
                self.provider.as_ref(),
                sink,
                stage,
                self.timeout,
                CAUSAL_CHAIN_PROMPT,
                messages.clone(),
                definitions.clone(),
                LlmRequestOptions::with_tool_call_mode(mode),
            )
            .await?;

            if let Some(text) = response.thinking.as_deref().filter(|t| !t.trim().is_empty()) {
                if !thinking.is_empty() {
                    thinking.push_str("\n\n");
                }
                thinking.push_str(text);
                sink.emit(TraceStreamEvent::Thinking {
                    content: text.to_string(),
                })
                .await?;
            }

            if !response.has_tool_calls() {
                break response;
            }

            if last_turn {
                tracing::warn!(
                    "[ChainBuilder] turn budget ({}) exhausted, ignoring {} tool request(s)",
                    self.max_turns,
                    response.tool_calls.len()
                );
                break response;
            }

            let mut results = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                results.push(self.run_tool(call, sink).await?);
            }

            messages.push(response.to_assistant_message());
            let mut next = Message::tool_results(results);
            if turn + 1 >= self.max_turns {
                next.content.push(MessageContent::Text {
                    text: FINAL_TURN_NUDGE.to_string(),
                });
            }
            messages.push(next);
        };

        let text = last_response.content.unwrap_or_default();
        let payload: ChainPayload = extract_as(&text).map_err(|e| AppError::malformed(stage, e))?;
        if payload.summary.trim().is_empty() {
            return Err(AppError::malformed(
                stage,
                CoreError::shape("summary is empty"),
            ));
        }
        let chains = prepare_chains(payload.chains, DEEP_CHAIN_COUNT)
            .map_err(|e| AppError::malformed(stage, e))?;

        tracing::info!(
            "[ChainBuilder] built {} chain(s) in {} turn(s)",
            chains.len(),
            turn
        );

        Ok(ChainBuildOutput {
            chains,
            summary: payload.summary,
            thinking,
            turns: turn,
        })
    }

    /// Execute one tool call between its `calling` and `done` events.
    async fn run_tool(&self, call: &ToolCall, sink: &EventSink) -> AppResult<MessageContent> {
        let input = self.tools.input_summary(&call.name, &call.arguments);
        let display_name = self.tools.display_name(&call.name);

        sink.emit(TraceStreamEvent::ToolCall {
            tool: call.name.clone(),
            display_name: display_name.clone(),
            input: input.clone(),
            status: ToolCallStatus::Calling,
        })
        .await?;

        let result = call_tool(self.tools.as_ref(), sink, self.timeout, call).await?;

        sink.emit(TraceStreamEvent::ToolCall {
            tool: call.name.clone(),
            display_name,
            input,
            status: ToolCallStatus::Done,
        })
        .await?;

        Ok(MessageContent::tool_result(
            call.id.clone(),
            result.to_content(),
            !result.success,
        ))
    }
}
