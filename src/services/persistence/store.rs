//! Trace Store
//!
//! Relational persistence for completed traces.

use async_trait::async_trait;
use symptom_trace_core::TraceResult;

use crate::storage::database::Database;
use crate::utils::error::{AppError, AppResult};

/// Destination for completed traces. Returns the stored trace id.
#[async_trait]
pub trait TraceStore: Send + Sync {
    fn name(&self) -> &str;

    fn display_name(&self) -> &str;

    async fn persist(&self, trace: &TraceResult, document: &str) -> AppResult<String>;
}

/// SQLite-backed trace store
#[derive(Debug, Clone)]
pub struct SqliteTraceStore {
    db: Database,
}

impl SqliteTraceStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TraceStore for SqliteTraceStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn display_name(&self) -> &str {
        "database"
    }

    async fn persist(&self, trace: &TraceResult, document: &str) -> AppResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let db = self.db.clone();
        let trace = trace.clone();
        let document = document.to_string();
        let row_id = id.clone();

        tokio::task::spawn_blocking(move || db.insert_trace(&row_id, &trace, &document))
            .await
            .map_err(|e| AppError::persistence(format!("Store task failed: {}", e)))?
            .map_err(|e| AppError::persistence(e.to_string()))?;

        Ok(id)
    }
}
