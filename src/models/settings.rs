//! Settings Models
//!
//! Application configuration stored in config.json and overlaid from the
//! environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use symptom_trace_core::MAX_TOOL_TURNS;
use symptom_trace_llm::{ProviderConfig, ProviderType};

/// Model settings for one pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageModelConfig {
    pub provider: ProviderType,
    pub model: String,
    pub max_tokens: u32,
    /// Enable extended thinking (Anthropic) or reasoning (OpenRouter)
    #[serde(default)]
    pub enable_thinking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_budget: Option<u32>,
}

impl StageModelConfig {
    fn new(provider: ProviderType, model: &str, max_tokens: u32) -> Self {
        Self {
            provider,
            model: model.to_string(),
            max_tokens,
            enable_thinking: false,
            thinking_budget: None,
        }
    }

    /// Build the provider config for this stage.
    pub fn provider_config(&self, api_key: Option<String>, timeout_secs: u64) -> ProviderConfig {
        ProviderConfig {
            provider: self.provider,
            api_key,
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            enable_thinking: self.enable_thinking,
            thinking_budget: self.thinking_budget,
            timeout_secs,
            ..Default::default()
        }
    }

    fn validate(&self, stage: &str) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err(format!("{}: model must not be empty", stage));
        }
        if self.max_tokens == 0 {
            return Err(format!("{}: max_tokens must be positive", stage));
        }
        if let (true, Some(budget)) = (self.enable_thinking, self.thinking_budget) {
            if budget >= self.max_tokens {
                return Err(format!(
                    "{}: thinking_budget ({}) must be below max_tokens ({})",
                    stage, budget, self.max_tokens
                ));
            }
            if self.provider == ProviderType::Anthropic && budget < 1024 {
                return Err(format!("{}: thinking_budget must be at least 1024", stage));
            }
        }
        Ok(())
    }
}

/// Application configuration stored in config.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub symptoms_model: StageModelConfig,
    pub chains_model: StageModelConfig,
    pub recommendations_model: StageModelConfig,
    pub quick_model: StageModelConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openrouter_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exa_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firecrawl_api_key: Option<String>,
    /// Obsidian Local REST API key; archiving is off without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obsidian_api_key: Option<String>,
    pub obsidian_base_url: String,

    /// Address the HTTP server listens on
    pub bind_addr: String,
    /// SQLite file; defaults to ~/.symptom-trace/traces.db
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Model turns allowed in the chain builder's tool loop
    pub max_tool_turns: u32,
    /// Upper bound on any single external call
    pub call_timeout_secs: u64,
    pub search_result_limit: u32,
    pub scrape_char_limit: usize,
    /// Buffered events per trace stream
    pub event_channel_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symptoms_model: StageModelConfig::new(
                ProviderType::OpenRouter,
                "minimax/minimax-m2.5",
                2000,
            ),
            chains_model: StageModelConfig {
                enable_thinking: true,
                thinking_budget: Some(4000),
                ..StageModelConfig::new(ProviderType::Anthropic, "claude-opus-4-6", 16000)
            },
            recommendations_model: StageModelConfig::new(
                ProviderType::Anthropic,
                "claude-sonnet-4-5-20250929",
                2000,
            ),
            quick_model: StageModelConfig::new(
                ProviderType::OpenRouter,
                "minimax/minimax-m2.5",
                4000,
            ),
            anthropic_api_key: None,
            openrouter_api_key: None,
            exa_api_key: None,
            firecrawl_api_key: None,
            obsidian_api_key: None,
            obsidian_base_url: "http://localhost:27124".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            database_path: None,
            max_tool_turns: 5,
            call_timeout_secs: 90,
            search_result_limit: 5,
            scrape_char_limit: 4000,
            event_channel_capacity: 64,
        }
    }
}

impl AppConfig {
    /// API key for a provider type
    pub fn api_key_for(&self, provider: ProviderType) -> Option<String> {
        match provider {
            ProviderType::Anthropic => self.anthropic_api_key.clone(),
            ProviderType::OpenRouter => self.openrouter_api_key.clone(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.symptoms_model.validate("symptoms_model")?;
        self.chains_model.validate("chains_model")?;
        self.recommendations_model.validate("recommendations_model")?;
        self.quick_model.validate("quick_model")?;

        if !(1..=MAX_TOOL_TURNS).contains(&self.max_tool_turns) {
            return Err(format!(
                "max_tool_turns must be between 1 and {}, got {}",
                MAX_TOOL_TURNS, self.max_tool_turns
            ));
        }

        if self.call_timeout_secs == 0 || self.call_timeout_secs > 600 {
            return Err("call_timeout_secs must be between 1 and 600".to_string());
        }

        if !(1..=10).contains(&self.search_result_limit) {
            return Err("search_result_limit must be between 1 and 10".to_string());
        }

        if self.scrape_char_limit < 500 {
            return Err("scrape_char_limit must be at least 500".to_string());
        }

        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be positive".to_string());
        }

        if self.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(format!("Invalid bind_addr: {}", self.bind_addr));
        }

        match reqwest::Url::parse(&self.obsidian_base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => {
                return Err(format!(
                    "Invalid obsidian_base_url: {}",
                    self.obsidian_base_url
                ))
            }
        }

        Ok(())
    }
}
