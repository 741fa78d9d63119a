//! OpenRouter Provider
//!
//! OpenAI-compatible chat completions through OpenRouter. Used for the
//! low-latency quick trace model.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::http_client::{build_http_client, map_transport_error};
use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageContent, MessageRole,
    ProviderConfig, StopReason, ToolCall, ToolCallMode, ToolDefinition, UsageStats,
};

/// Default OpenRouter API endpoint
const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// OpenRouter provider
pub struct OpenRouterProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    /// Create a new OpenRouter provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { config, client })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENROUTER_API_URL)
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[Message],
        system: Option<&str>,
        tools: &[ToolDefinition],
        request_options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": request_options
                .temperature_override
                .unwrap_or(self.config.temperature),
        });

        let mut openai_messages: Vec<serde_json::Value> = Vec::new();
        if let Some(sys) = system {
            openai_messages.push(serde_json::json!({
                "role": "system",
                "content": sys
            }));
        }
        for msg in messages {
            openai_messages.extend(self.message_to_openai(msg));
        }
        body["messages"] = serde_json::json!(openai_messages);

        if !tools.is_empty() {
            let openai_tools: Vec<serde_json::Value> =
                tools.iter().map(|t| self.tool_to_openai(t)).collect();
            body["tools"] = serde_json::json!(openai_tools);
            match request_options.tool_call_mode {
                ToolCallMode::Required => body["tool_choice"] = serde_json::json!("required"),
                ToolCallMode::None => body["tool_choice"] = serde_json::json!("none"),
                ToolCallMode::Auto => {}
            }
        }

        if self.config.enable_thinking {
            body["reasoning"] = match self.config.thinking_budget {
                Some(budget) => serde_json::json!({ "max_tokens": budget }),
                None => serde_json::json!({ "enabled": true }),
            };
        }

        body
    }

    /// Convert a Message to OpenAI chat format.
    ///
    /// Tool results fan out to one `tool` message per result.
    fn message_to_openai(&self, message: &Message) -> Vec<serde_json::Value> {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        };

        let tool_results: Vec<serde_json::Value> = message
            .content
            .iter()
            .filter_map(|c| match c {
                MessageContent::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } => Some(serde_json::json!({
                    "role": "tool",
                    "tool_call_id": tool_use_id,
                    "content": content
                })),
                _ => None,
            })
            .collect();
        let text_content = message.text_content();
        if !tool_results.is_empty() {
            let mut out = tool_results;
            if !text_content.is_empty() {
                out.push(serde_json::json!({
                    "role": "user",
                    "content": text_content
                }));
            }
            return out;
        }

        let tool_calls: Vec<serde_json::Value> = message
            .content
            .iter()
            .filter_map(|c| match c {
                MessageContent::ToolUse { id, name, input } => Some(serde_json::json!({
                    "id": id,
                    "type": "function",
                    "function": {
                        "name": name,
                        "arguments": input.to_string()
                    }
                })),
                _ => None,
            })
            .collect();

        if tool_calls.is_empty() {
            return vec![serde_json::json!({
                "role": role,
                "content": text_content
            })];
        }

        let mut msg = serde_json::json!({
            "role": role,
            "tool_calls": tool_calls
        });
        // Some compatible APIs require the field even when empty
        msg["content"] = if text_content.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::json!(text_content)
        };
        vec![msg]
    }

    fn tool_to_openai(&self, tool: &ToolDefinition) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema
            }
        })
    }

    fn parse_response(&self, response: OpenAIResponse) -> LlmResponse {
        let mut content = None;
        let mut thinking = None;
        let mut tool_calls = Vec::new();
        let mut stop_reason = StopReason::EndTurn;

        if let Some(choice) = response.choices.into_iter().next() {
            if let Some(reason) = choice.finish_reason.as_deref() {
                stop_reason = StopReason::from(reason);
            }
            if let Some(msg) = choice.message {
                content = msg.content.filter(|c| !c.is_empty());
                thinking = msg
                    .reasoning
                    .or(msg.reasoning_content)
                    .filter(|r| !r.is_empty());

                for tc in msg.tool_calls.unwrap_or_default() {
                    let arguments = serde_json::from_str(&tc.function.arguments)
                        .unwrap_or(serde_json::Value::Null);
                    tool_calls.push(ToolCall {
                        id: tc.id,
                        name: tc.function.name,
                        arguments,
                    });
                }
            }
        }

        let usage = response
            .usage
            .map(|u| UsageStats {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                thinking_tokens: None,
            })
            .unwrap_or_default();

        LlmResponse {
            content,
            thinking,
            thinking_blocks: Vec::new(),
            tool_calls,
            stop_reason,
            usage,
            model: response.model.unwrap_or_else(|| self.config.model.clone()),
        }
    }

    async fn post(&self, api_key: &str, body: &serde_json::Value) -> LlmResult<(u16, String)> {
        let response = self
            .client
            .post(self.base_url())
            .bearer_auth(api_key)
            .header("content-type", "application/json")
            .header("X-Title", "Symptom Trace")
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(map_transport_error)?;
        Ok((status, body_text))
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("openrouter"))?;

        let body = self.build_request_body(&messages, system.as_deref(), &tools, &request_options);
        let (status, body_text) = self.post(api_key, &body).await?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, "openrouter"));
        }

        let parsed: OpenAIResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        // OpenRouter reports upstream failures inside a 200 body
        if let Some(err) = parsed.error.as_ref() {
            return Err(LlmError::ServerError {
                message: err.message.clone(),
                status: None,
            });
        }

        Ok(self.parse_response(parsed))
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ResponseUsage>,
    #[serde(default)]
    error: Option<ResponseError>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: Option<ResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    id: String,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ResponseError {
    message: String,
}
