//! Symptom Trace Tools
//!
//! The research tools available to the causal chain builder:
//! - `ToolAdapter` - the seam the tool-use loop calls through
//! - `ResearchToolAdapter` - production adapter (search + scrape)
//! - `ResearchSearch` / `SearchProvider` - medical research search (Exa)
//! - `ArticleScraper` / `ScrapeProvider` - article scraping (Firecrawl), cached
//! - `ToolResult` - execution result type

pub mod adapter;
pub mod executor;
pub mod scrape;
pub mod search;

pub use adapter::{
    research_tool_definitions, ResearchToolAdapter, ToolAdapter, SCRAPE_TOOL, SEARCH_TOOL,
};
pub use executor::ToolResult;
pub use scrape::{validate_url, ArticleScraper, FirecrawlScrapeProvider, ScrapeProvider};
pub use search::{ExaSearchProvider, ResearchSearch, SearchProvider, SearchResult};
