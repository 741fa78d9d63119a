//! Bounded External Calls
//!
//! Every model request and tool invocation made by a stage goes through
//! here: each carries a timeout and is abandoned when the stream consumer
//! disconnects.

use std::time::Duration;

use symptom_trace_core::TraceStage;
use symptom_trace_llm::{
    LlmError, LlmProvider, LlmRequestOptions, LlmResponse, Message, ToolCall, ToolDefinition,
};
use symptom_trace_tools::{ToolAdapter, ToolResult};

use super::events::EventSink;
use crate::utils::error::{AppError, AppResult};

/// Send one model request on behalf of `stage`.
///
/// Provider errors and timeouts become `StageFailure`; a disconnect
/// becomes `Cancelled`.
#[allow(clippy::too_many_arguments)]
pub async fn call_model(
    provider: &dyn LlmProvider,
    sink: &EventSink,
    stage: TraceStage,
    timeout: Duration,
    system: &str,
    messages: Vec<Message>,
    tools: Vec<ToolDefinition>,
    options: LlmRequestOptions,
) -> AppResult<LlmResponse> {
    let request = provider.send_message(messages, Some(system.to_string()), tools, options);

    tokio::select! {
        _ = sink.closed() => Err(AppError::Cancelled),
        outcome = tokio::time::timeout(timeout, request) => match outcome {
            Ok(Ok(response)) => {
                tracing::debug!(
                    "[{}] {} responded: {} in / {} out tokens",
                    stage,
                    provider.model(),
                    response.usage.input_tokens,
                    response.usage.output_tokens
                );
                Ok(response)
            }
            Ok(Err(e)) => Err(AppError::stage(stage, e)),
            Err(_) => Err(AppError::stage(
                stage,
                LlmError::Timeout {
                    message: format!("no response from {} within {:?}", provider.name(), timeout),
                },
            )),
        },
    }
}

/// Run one tool call. Failures, including timeouts, come back as failed
/// results for the model; only a disconnect is an error.
pub async fn call_tool(
    tools: &dyn ToolAdapter,
    sink: &EventSink,
    timeout: Duration,
    call: &ToolCall,
) -> AppResult<ToolResult> {
    let run = tools.execute(&call.name, &call.arguments);

    tokio::select! {
        _ = sink.closed() => Err(AppError::Cancelled),
        outcome = tokio::time::timeout(timeout, run) => Ok(match outcome {
            Ok(result) => result,
            Err(_) => {
                let err = AppError::tool(format!("{} timed out after {:?}", call.name, timeout));
                tracing::warn!("[ChainBuilder] {}", err);
                ToolResult::err(err.to_string())
            }
        }),
    }
}
