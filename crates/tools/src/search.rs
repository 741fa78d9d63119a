//! Medical Research Search
//!
//! Pluggable search backend behind the `search_medical_research` tool.
//! Exa is the production provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default Exa search endpoint
const EXA_API_URL: &str = "https://api.exa.ai/search";

/// Excerpt length requested per result
const EXCERPT_CHARS: usize = 3000;

/// Upper bound on results regardless of configuration
const MAX_RESULTS: u32 = 10;

/// A search result entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub excerpt: String,
}

/// Trait for pluggable search providers
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for display
    fn name(&self) -> &str;

    /// Execute a search query
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, String>;
}

/// Exa neural search provider (requires API key)
pub struct ExaSearchProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl ExaSearchProvider {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("symptom-trace/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: EXA_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl SearchProvider for ExaSearchProvider {
    fn name(&self) -> &str {
        "Exa"
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| "EXA_API_KEY not set".to_string())?;

        let body = serde_json::json!({
            "query": query,
            "type": "auto",
            "numResults": max_results,
            "contents": {
                "text": { "maxCharacters": EXCERPT_CHARS }
            }
        });

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Exa request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let err_body = response.text().await.unwrap_or_default();
            return Err(format!("Exa API error: {} {}", status.as_u16(), err_body));
        }

        let data: ExaResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Exa response: {}", e))?;

        Ok(data
            .results
            .into_iter()
            .map(|r| SearchResult {
                title: r.title.unwrap_or_default(),
                url: r.url.unwrap_or_default(),
                excerpt: r.text.unwrap_or_default(),
            })
            .collect())
    }
}

/// Search service with a bounded result count
pub struct ResearchSearch {
    provider: Box<dyn SearchProvider>,
    result_limit: u32,
}

impl ResearchSearch {
    pub fn new(provider: Box<dyn SearchProvider>, result_limit: u32) -> Self {
        Self {
            provider,
            result_limit: result_limit.clamp(1, MAX_RESULTS),
        }
    }

    /// Run a search and render the results as JSON for the model.
    pub async fn search(&self, query: &str) -> Result<String, String> {
        // Strip control chars
        let query: String = query
            .chars()
            .filter(|c| !c.is_control() || *c == ' ')
            .collect();

        if query.trim().is_empty() {
            return Err("Search query cannot be empty".to_string());
        }

        let mut results = self.provider.search(query.trim(), self.result_limit).await?;
        results.truncate(self.result_limit as usize);

        tracing::debug!(
            "[ResearchSearch] {} returned {} results for '{}'",
            self.provider.name(),
            results.len(),
            query
        );

        serde_json::to_string_pretty(&results)
            .map_err(|e| format!("Failed to encode search results: {}", e))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}
