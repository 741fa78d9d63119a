//! Trace Service
//!
//! Builds both pipelines from configuration and starts traces, one
//! independent task and stream per request.

use std::sync::Arc;
use std::time::Duration;

use symptom_trace_core::TraceStreamEvent;
use symptom_trace_llm::{create_provider, LlmProvider};
use symptom_trace_tools::{
    ArticleScraper, ExaSearchProvider, FirecrawlScrapeProvider, ResearchSearch,
    ResearchToolAdapter, ToolAdapter,
};
use tokio::sync::mpsc;

use super::chain_builder::ChainBuilder;
use super::events::EventSink;
use super::orchestrator::TraceOrchestrator;
use super::quick_trace::QuickTrace;
use super::recommendation::RecommendationStage;
use super::symptom_analyzer::SymptomAnalyzer;
use crate::models::response::TraceMode;
use crate::models::settings::{AppConfig, StageModelConfig};
use crate::services::persistence::{ObsidianArchive, SqliteTraceStore};
use crate::storage::database::Database;
use crate::utils::error::{AppError, AppResult};

pub struct TraceService {
    orchestrator: Arc<TraceOrchestrator>,
    quick: Arc<QuickTrace>,
    channel_capacity: usize,
}

impl TraceService {
    pub fn new(
        orchestrator: TraceOrchestrator,
        quick: QuickTrace,
        channel_capacity: usize,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            quick: Arc::new(quick),
            channel_capacity,
        }
    }

    /// Wire providers, research tools and persistence from configuration.
    pub fn from_config(config: &AppConfig, db: Option<Database>) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.call_timeout_secs);
        let provider = |stage: &StageModelConfig| -> AppResult<Arc<dyn LlmProvider>> {
            let provider_config = stage.provider_config(
                config.api_key_for(stage.provider),
                config.call_timeout_secs,
            );
            create_provider(provider_config).map_err(|e| AppError::config(e.to_string()))
        };

        let search = ExaSearchProvider::new(config.exa_api_key.clone(), timeout)
            .map_err(AppError::config)?;
        let scrape = FirecrawlScrapeProvider::new(config.firecrawl_api_key.clone(), timeout)
            .map_err(AppError::config)?;
        let search = ResearchSearch::new(Box::new(search), config.search_result_limit);
        let scrape = ArticleScraper::new(Box::new(scrape), config.scrape_char_limit);
        tracing::info!(
            "[TraceService] research via {} search and {} scraping",
            search.provider_name(),
            scrape.provider_name()
        );
        let tools: Arc<dyn ToolAdapter> = Arc::new(ResearchToolAdapter::new(search, scrape));

        let mut orchestrator = TraceOrchestrator::new(
            SymptomAnalyzer::new(provider(&config.symptoms_model)?, timeout),
            ChainBuilder::new(
                provider(&config.chains_model)?,
                tools,
                timeout,
                config.max_tool_turns,
            ),
            RecommendationStage::new(provider(&config.recommendations_model)?, timeout),
        );

        match config.obsidian_api_key.as_deref() {
            Some(key) => {
                let archive = ObsidianArchive::new(&config.obsidian_base_url, key, timeout)?;
                orchestrator = orchestrator.with_archive(Arc::new(archive));
            }
            None => tracing::info!("[TraceService] OBSIDIAN_API_KEY not set, archiving disabled"),
        }

        if let Some(db) = db {
            orchestrator = orchestrator.with_store(Arc::new(SqliteTraceStore::new(db)));
        }

        let quick = QuickTrace::new(provider(&config.quick_model)?, timeout);

        Ok(Self::new(orchestrator, quick, config.event_channel_capacity))
    }

    /// Start a trace in the background and return its event stream.
    ///
    /// The stream ends after the terminal event. Dropping the receiver
    /// cancels the trace.
    pub fn start(&self, input_text: String, mode: TraceMode) -> mpsc::Receiver<TraceStreamEvent> {
        let (sink, rx) = EventSink::channel(self.channel_capacity);

        match mode {
            TraceMode::Deep => {
                let orchestrator = self.orchestrator.clone();
                tokio::spawn(async move {
                    orchestrator.run(&input_text, sink).await;
                });
            }
            TraceMode::Quick => {
                let quick = self.quick.clone();
                tokio::spawn(async move {
                    quick.run(&input_text, sink).await;
                });
            }
        }

        rx
    }
}
