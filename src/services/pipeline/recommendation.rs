//! Recommendation Stage
//!
//! One model call turning chains and summary into triaged suggestions.
//! The returned list is always re-sorted urgent first, whatever order the
//! model used.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use symptom_trace_core::{
    extract_as, prepare_suggestions, CausalChain, Suggestion, TraceStage, SUGGESTION_COUNT,
};
use symptom_trace_llm::{LlmProvider, LlmRequestOptions, Message};

use super::call::call_model;
use super::events::EventSink;
use super::prompts::{recommendation_user_prompt, RECOMMENDATION_PROMPT};
use crate::utils::error::{AppError, AppResult};

#[derive(Deserialize)]
struct SuggestionPayload {
    suggestions: Vec<Suggestion>,
}

pub struct RecommendationStage {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl RecommendationStage {
    pub fn new(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub async fn recommend(
        &self,
        chains: &[CausalChain],
        summary: &str,
        sink: &EventSink,
    ) -> AppResult<Vec<Suggestion>> {
        let stage = TraceStage::Recommendations;
        let response = call_model(
            self.provider.as_ref(),
            sink,
            stage,
            self.timeout,
            RECOMMENDATION_PROMPT,
            vec![Message::user(recommendation_user_prompt(chains, summary)?)],
            Vec::new(),
            LlmRequestOptions::default(),
        )
        .await?;

        let text = response.content.unwrap_or_default();
        let payload: SuggestionPayload =
            extract_as(&text).map_err(|e| AppError::malformed(stage, e))?;
        let suggestions = prepare_suggestions(payload.suggestions, SUGGESTION_COUNT)
            .map_err(|e| AppError::malformed(stage, e))?;

        tracing::info!(
            "[Recommendation] {} suggestion(s), {} for the doctor",
            suggestions.len(),
            suggestions.iter().filter(|s| s.for_doctor).count()
        );
        Ok(suggestions)
    }
}
