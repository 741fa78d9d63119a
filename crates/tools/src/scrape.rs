//! Article Scraping
//!
//! Backend for the `scrape_article` tool: fetches a page as markdown through
//! a scrape provider, with URL validation, output capping, and a short-lived
//! cache so repeated requests for the same article within a trace (or across
//! traces) are not re-fetched.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use mini_moka::sync::Cache;
use serde::Deserialize;

/// Default Firecrawl scrape endpoint
const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev/v1/scrape";

/// Cache TTL (15 minutes)
const CACHE_TTL_SECS: u64 = 15 * 60;

/// Maximum cache entries
const MAX_CACHE_ENTRIES: u64 = 100;

/// Trait for pluggable scrape providers
#[async_trait]
pub trait ScrapeProvider: Send + Sync {
    /// Provider name for display
    fn name(&self) -> &str;

    /// Fetch a page as markdown
    async fn scrape(&self, url: &str) -> Result<String, String>;
}

/// Firecrawl scrape provider (requires API key)
pub struct FirecrawlScrapeProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl FirecrawlScrapeProvider {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("symptom-trace/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: FIRECRAWL_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct FirecrawlResponse {
    #[serde(default)]
    data: Option<FirecrawlData>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlData {
    #[serde(default)]
    markdown: Option<String>,
}

#[async_trait]
impl ScrapeProvider for FirecrawlScrapeProvider {
    fn name(&self) -> &str {
        "Firecrawl"
    }

    async fn scrape(&self, url: &str) -> Result<String, String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| "FIRECRAWL_API_KEY not set".to_string())?;

        let body = serde_json::json!({
            "url": url,
            "formats": ["markdown"],
            "onlyMainContent": true
        });

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Firecrawl request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let err_body = response.text().await.unwrap_or_default();
            return Err(format!("Firecrawl API error: {} {}", status.as_u16(), err_body));
        }

        let data: FirecrawlResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Firecrawl response: {}", e))?;

        Ok(data.data.and_then(|d| d.markdown).unwrap_or_default())
    }
}

/// Scrape service with validation, truncation, and caching
pub struct ArticleScraper {
    provider: Box<dyn ScrapeProvider>,
    cache: Cache<String, String>,
    char_limit: usize,
}

impl ArticleScraper {
    pub fn new(provider: Box<dyn ScrapeProvider>, char_limit: usize) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CACHE_ENTRIES)
            .time_to_live(Duration::from_secs(CACHE_TTL_SECS))
            .build();

        Self {
            provider,
            cache,
            char_limit: char_limit.max(1),
        }
    }

    /// Scrape a URL and return at most `char_limit` characters of markdown.
    pub async fn scrape(&self, url_str: &str) -> Result<String, String> {
        let url = validate_url(url_str)?;
        let key = url.to_string();

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("[ArticleScraper] cache hit for {}", key);
            return Ok(cached);
        }

        let markdown = self.provider.scrape(url.as_str()).await?;
        let result = truncate_chars(&markdown, self.char_limit);

        self.cache.insert(key, result.clone());
        Ok(result)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}

/// Validate a URL: parse, require http(s), block private/local hosts
pub fn validate_url(url_str: &str) -> Result<url::Url, String> {
    let url = url::Url::parse(url_str.trim()).map_err(|e| format!("Invalid URL: {}", e))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!(
            "Unsupported URL scheme '{}': only http and https are allowed",
            url.scheme()
        ));
    }

    let host = url
        .host_str()
        .ok_or_else(|| "URL has no host".to_string())?;

    if is_private_host(host) {
        return Err(format!("Blocked: private/local address '{}'", host));
    }

    Ok(url)
}

/// Check if a hostname names a private/local address
fn is_private_host(host: &str) -> bool {
    let lower = host.trim_start_matches('[').trim_end_matches(']').to_lowercase();
    if lower == "localhost" || lower.ends_with(".local") || lower.ends_with(".internal") {
        return true;
    }

    match lower.parse::<IpAddr>() {
        Ok(IpAddr::V4(ipv4)) => {
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_unspecified()
                || ipv4.is_broadcast()
        }
        Ok(IpAddr::V6(ipv6)) => ipv6.is_loopback() || ipv6.is_unspecified(),
        Err(_) => false,
    }
}

/// Keep the first `limit` characters (not bytes).
fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
