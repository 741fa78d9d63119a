//! Research Tool Adapter
//!
//! Exposes the two research tools to the chain builder's tool-use loop:
//! `search_medical_research(query)` and `scrape_article(url)`.
//! Backend failures never escape as errors; they come back as failed
//! [`ToolResult`]s that the loop forwards to the model.

use std::collections::HashMap;

use async_trait::async_trait;
use symptom_trace_llm::{ParameterSchema, ToolDefinition};

use crate::executor::ToolResult;
use crate::scrape::ArticleScraper;
use crate::search::ResearchSearch;

pub const SEARCH_TOOL: &str = "search_medical_research";
pub const SCRAPE_TOOL: &str = "scrape_article";

/// Seam between the tool-use loop and whatever executes tools.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    /// Tool declarations sent to the model
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Execute one tool call. Never fails; errors are reported in the result.
    async fn execute(&self, name: &str, arguments: &serde_json::Value) -> ToolResult;

    /// Human-readable label for progress events
    fn display_name(&self, name: &str) -> String {
        match name {
            SEARCH_TOOL => "Searching medical research".to_string(),
            SCRAPE_TOOL => "Reading article".to_string(),
            other => other.to_string(),
        }
    }

    /// The input string shown with progress events and used as the
    /// tool-call identity key
    fn input_summary(&self, name: &str, arguments: &serde_json::Value) -> String {
        let field = match name {
            SEARCH_TOOL => "query",
            SCRAPE_TOOL => "url",
            _ => return arguments.to_string(),
        };
        string_arg(arguments, field).unwrap_or_else(|| arguments.to_string())
    }
}

fn string_arg(arguments: &serde_json::Value, field: &str) -> Option<String> {
    arguments
        .get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Tool declarations for the research tools
pub fn research_tool_definitions() -> Vec<ToolDefinition> {
    let mut search_props = HashMap::new();
    search_props.insert(
        "query".to_string(),
        ParameterSchema::string(Some(
            "Search query about SCD symptoms, mechanisms, or treatments",
        )),
    );

    let mut scrape_props = HashMap::new();
    scrape_props.insert(
        "url".to_string(),
        ParameterSchema::string(Some("URL of the article to scrape")),
    );

    vec![
        ToolDefinition {
            name: SEARCH_TOOL.to_string(),
            description: "Search for medical research and sickle cell disease information relevant to the patient's symptoms".to_string(),
            input_schema: ParameterSchema::object(None, search_props, vec!["query".to_string()]),
        },
        ToolDefinition {
            name: SCRAPE_TOOL.to_string(),
            description: "Scrape the full content of a medical article or research paper for detailed information".to_string(),
            input_schema: ParameterSchema::object(None, scrape_props, vec!["url".to_string()]),
        },
    ]
}

/// Production adapter backed by a search service and a scraper
pub struct ResearchToolAdapter {
    search: ResearchSearch,
    scraper: ArticleScraper,
}

impl ResearchToolAdapter {
    pub fn new(search: ResearchSearch, scraper: ArticleScraper) -> Self {
        Self { search, scraper }
    }
}

#[async_trait]
impl ToolAdapter for ResearchToolAdapter {
    fn definitions(&self) -> Vec<ToolDefinition> {
        research_tool_definitions()
    }

    async fn execute(&self, name: &str, arguments: &serde_json::Value) -> ToolResult {
        let outcome = match name {
            SEARCH_TOOL => match string_arg(arguments, "query") {
                Some(query) => self.search.search(&query).await,
                None => Err("Missing required parameter 'query'".to_string()),
            },
            SCRAPE_TOOL => match string_arg(arguments, "url") {
                Some(url) => self.scraper.scrape(&url).await,
                None => Err("Missing required parameter 'url'".to_string()),
            },
            other => Err(format!("Unknown tool: {}", other)),
        };

        match outcome {
            Ok(output) => ToolResult::ok(output),
            Err(e) => {
                tracing::warn!("[ResearchTools] {} failed: {}", name, e);
                ToolResult::err(e)
            }
        }
    }
}
