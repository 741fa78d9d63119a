//! Trace Orchestrator
//!
//! Runs the deep pipeline strictly in sequence:
//! `symptoms -> chains -> recommendations -> saving -> complete`.
//!
//! Any stage failure ends the stream with a single `error` event and skips
//! the remaining stages. Archive and store failures are logged and never
//! reach the stream. When the consumer disconnects nothing further is
//! emitted and nothing is persisted.

use std::sync::Arc;

use chrono::Utc;
use symptom_trace_core::{TraceResult, TraceStage, TraceStreamEvent};

use super::chain_builder::ChainBuilder;
use super::events::EventSink;
use super::recommendation::RecommendationStage;
use super::symptom_analyzer::SymptomAnalyzer;
use crate::services::persistence::{format_trace_markdown, TraceArchive, TraceStore};
use crate::utils::error::{AppError, AppResult};

pub struct TraceOrchestrator {
    analyzer: SymptomAnalyzer,
    builder: ChainBuilder,
    recommender: RecommendationStage,
    archive: Option<Arc<dyn TraceArchive>>,
    store: Option<Arc<dyn TraceStore>>,
}

impl TraceOrchestrator {
    pub fn new(
        analyzer: SymptomAnalyzer,
        builder: ChainBuilder,
        recommender: RecommendationStage,
    ) -> Self {
        Self {
            analyzer,
            builder,
            recommender,
            archive: None,
            store: None,
        }
    }

    pub fn with_archive(mut self, archive: Arc<dyn TraceArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn TraceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Run one trace to its terminal event.
    ///
    /// Returns the result when the trace completed and `done` was delivered.
    pub async fn run(&self, input_text: &str, sink: EventSink) -> Option<TraceResult> {
        let result = match self.execute(input_text, &sink).await {
            Ok(result) => result,
            Err(AppError::Cancelled) => {
                tracing::info!("[Orchestrator] client disconnected, trace abandoned");
                return None;
            }
            Err(e) => {
                if e.is_fatal() {
                    tracing::error!("[Orchestrator] trace failed: {}", e);
                } else {
                    tracing::warn!("[Orchestrator] trace aborted: {}", e);
                }
                let _ = sink.emit(TraceStreamEvent::error(e.to_string())).await;
                return None;
            }
        };

        let trace_id = match self.persist(&result, &sink).await {
            Ok(id) => id,
            Err(_) => {
                tracing::info!("[Orchestrator] client disconnected before saving");
                return None;
            }
        };

        let finished = async {
            sink.emit(TraceStreamEvent::status(TraceStage::Complete, "Trace complete"))
                .await?;
            sink.emit(TraceStreamEvent::Done {
                success: true,
                trace_id,
            })
            .await
        };
        finished.await.ok().map(|_| result)
    }

    async fn execute(&self, input_text: &str, sink: &EventSink) -> AppResult<TraceResult> {
        sink.emit(TraceStreamEvent::status(
            TraceStage::Symptoms,
            "Parsing symptoms...",
        ))
        .await?;

        let symptoms = self.analyzer.analyze(input_text, sink).await?;
        sink.emit(TraceStreamEvent::Symptoms {
            symptoms: symptoms.symptoms.clone(),
            environmental_factors: symptoms.environmental_factors.clone(),
            temporal_pattern: symptoms.temporal_pattern,
        })
        .await?;

        sink.emit(TraceStreamEvent::status(
            TraceStage::Chains,
            "Tracing causal connections across body systems...",
        ))
        .await?;

        let built = self.builder.build(&symptoms, sink).await?;
        tracing::info!(
            "[Orchestrator] {} chain(s) after {} model turn(s)",
            built.chains.len(),
            built.turns
        );
        for chain in &built.chains {
            sink.emit(TraceStreamEvent::Chain {
                chain: chain.clone(),
            })
            .await?;
        }
        sink.emit(TraceStreamEvent::Summary {
            content: built.summary.clone(),
        })
        .await?;

        sink.emit(TraceStreamEvent::status(
            TraceStage::Recommendations,
            "Generating actionable suggestions...",
        ))
        .await?;

        let suggestions = self
            .recommender
            .recommend(&built.chains, &built.summary, sink)
            .await?;
        sink.emit(TraceStreamEvent::Suggestions {
            suggestions: suggestions.clone(),
        })
        .await?;

        Ok(TraceResult {
            symptoms,
            chains: built.chains,
            summary: built.summary,
            suggestions,
            thinking: built.thinking,
        })
    }

    /// Hand the completed trace to the archive and the store.
    ///
    /// Only a disconnect is returned as an error; sink failures are logged.
    async fn persist(&self, result: &TraceResult, sink: &EventSink) -> AppResult<Option<String>> {
        if sink.is_closed() {
            return Err(AppError::Cancelled);
        }

        let document = format_trace_markdown(result, Utc::now());

        if let Some(archive) = &self.archive {
            sink.emit(TraceStreamEvent::saving(
                format!("Saving to {}...", archive.display_name()),
                &[archive.name()],
            ))
            .await?;
            if let Err(e) = archive.save(&result.symptoms.headline(), &document).await {
                tracing::warn!("[Orchestrator] {} save failed: {}", archive.name(), e);
            }
        }

        let mut trace_id = None;
        if let Some(store) = &self.store {
            sink.emit(TraceStreamEvent::saving(
                format!("Saving to {}...", store.display_name()),
                &[store.name()],
            ))
            .await?;
            match store.persist(result, &document).await {
                Ok(id) => {
                    tracing::info!("[Orchestrator] stored trace {}", id);
                    trace_id = Some(id);
                }
                Err(e) => tracing::warn!("[Orchestrator] {} save failed: {}", store.name(), e),
            }
        }

        Ok(trace_id)
    }
}
