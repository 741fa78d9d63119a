//! Symptom Trace - Rust Backend Library
//!
//! Turns a free-text symptom description into causal chains and triaged
//! suggestions through a staged LLM pipeline, streamed over HTTP as
//! server-sent events. It includes:
//! - The HTTP surface (`POST /trace`, health, stored traces)
//! - The deep and quick trace pipelines
//! - Persistence to a markdown archive and a SQLite store
//! - Configuration, data models and utilities

pub mod models;
pub mod server;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use server::router;
pub use services::pipeline::TraceService;
pub use state::AppState;
pub use storage::{ConfigService, Database};
pub use utils::error::{AppError, AppResult};
