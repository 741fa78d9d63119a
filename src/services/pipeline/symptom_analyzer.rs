//! Symptom Analyzer Stage
//!
//! One model call: free text in, validated `SymptomAnalysis` out.

use std::sync::Arc;
use std::time::Duration;

use symptom_trace_core::{extract_as, SymptomAnalysis, TraceStage};
use symptom_trace_llm::{LlmProvider, LlmRequestOptions, Message};

use super::call::call_model;
use super::events::EventSink;
use super::prompts::{symptom_user_prompt, SYMPTOM_ANALYZER_PROMPT};
use crate::utils::error::{AppError, AppResult};

pub struct SymptomAnalyzer {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl SymptomAnalyzer {
    pub fn new(provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Parse `input_text` into structured symptoms. Single attempt, no retries.
    pub async fn analyze(&self, input_text: &str, sink: &EventSink) -> AppResult<SymptomAnalysis> {
        let stage = TraceStage::Symptoms;
        let response = call_model(
            self.provider.as_ref(),
            sink,
            stage,
            self.timeout,
            SYMPTOM_ANALYZER_PROMPT,
            vec![Message::user(symptom_user_prompt(input_text))],
            Vec::new(),
            LlmRequestOptions::default(),
        )
        .await?;

        let text = response.content.unwrap_or_default();
        let mut analysis: SymptomAnalysis =
            extract_as(&text).map_err(|e| AppError::malformed(stage, e))?;
        analysis.raw_input = input_text.to_string();
        analysis
            .validate()
            .map_err(|e| AppError::malformed(stage, e))?;

        tracing::info!(
            "[SymptomAnalyzer] parsed {} symptom(s)",
            analysis.symptoms.len()
        );
        Ok(analysis)
    }
}
