//! Trace Pipeline
//!
//! The deep pipeline (symptom analysis, chain building with research tools,
//! recommendations) behind `TraceOrchestrator`, the single-call
//! `QuickTrace`, and the `EventSink` both of them stream through.

pub mod call;
pub mod chain_builder;
pub mod events;
pub mod orchestrator;
pub mod prompts;
pub mod quick_trace;
pub mod recommendation;
pub mod service;
pub mod symptom_analyzer;

pub use chain_builder::{ChainBuildOutput, ChainBuilder};
pub use events::EventSink;
pub use orchestrator::TraceOrchestrator;
pub use quick_trace::QuickTrace;
pub use recommendation::RecommendationStage;
pub use service::TraceService;
pub use symptom_analyzer::SymptomAnalyzer;
