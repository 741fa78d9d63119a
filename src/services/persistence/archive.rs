//! Note Archive
//!
//! Writes trace documents into an Obsidian vault through the Local REST API
//! plugin (`PUT /vault/<path>`).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::markdown::archive_note_path;
use crate::utils::error::{AppError, AppResult};

/// Destination for archived trace documents
#[async_trait]
pub trait TraceArchive: Send + Sync {
    /// Short sink id carried on `saving` status events
    fn name(&self) -> &str;

    /// Label used in status messages
    fn display_name(&self) -> &str;

    async fn save(&self, title: &str, document: &str) -> AppResult<()>;
}

/// Obsidian Local REST API archive
pub struct ObsidianArchive {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ObsidianArchive {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn note_url(&self, path: &str) -> String {
        format!("{}/vault/{}", self.base_url, urlencoding::encode(path))
    }
}

#[async_trait]
impl TraceArchive for ObsidianArchive {
    fn name(&self) -> &str {
        "obsidian"
    }

    fn display_name(&self) -> &str {
        "Obsidian"
    }

    async fn save(&self, title: &str, document: &str) -> AppResult<()> {
        let path = archive_note_path(title, Utc::now());

        let response = self
            .client
            .put(self.note_url(&path))
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "text/markdown")
            .body(document.to_string())
            .send()
            .await
            .map_err(|e| AppError::persistence(format!("Obsidian request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::persistence(format!(
                "Obsidian save failed: {}",
                status.as_u16()
            )));
        }

        tracing::info!("[Archive] saved {}", path);
        Ok(())
    }
}
