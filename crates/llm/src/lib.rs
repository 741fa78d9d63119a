//! Symptom Trace LLM
//!
//! Provides a unified interface for the language models the trace pipeline
//! talks to:
//! - Anthropic Claude (deep pipeline, extended thinking + tools)
//! - OpenRouter (OpenAI-compatible, quick pipeline)
//!
//! Also includes the HTTP client factory.

use std::sync::Arc;

pub mod anthropic;
pub mod http_client;
pub mod openrouter;
pub mod provider;
pub mod types;

// Re-export main types
pub use anthropic::AnthropicProvider;
pub use http_client::build_http_client;
pub use openrouter::OpenRouterProvider;
pub use provider::LlmProvider;
pub use types::*;

/// Create an LLM provider from a ProviderConfig.
///
/// Factory function that maps ProviderType to the concrete provider implementation.
pub fn create_provider(config: ProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderType::Anthropic => Arc::new(AnthropicProvider::new(config)?),
        ProviderType::OpenRouter => Arc::new(OpenRouterProvider::new(config)?),
    };
    Ok(provider)
}
