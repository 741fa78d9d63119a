//! Application State
//!
//! Shared state handed to every HTTP handler. Cheap to clone.

use std::sync::Arc;

use crate::models::settings::AppConfig;
use crate::services::pipeline::TraceService;
use crate::storage::Database;
use crate::utils::error::AppResult;
use crate::utils::paths::database_path;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// `None` when the database could not be opened
    pub database: Option<Database>,
    pub traces: Arc<TraceService>,
}

impl AppState {
    pub fn new(config: AppConfig, database: Option<Database>, traces: TraceService) -> Self {
        Self {
            config: Arc::new(config),
            database,
            traces: Arc::new(traces),
        }
    }

    /// Open storage and wire the pipelines.
    ///
    /// A database that fails to open is logged and traces run unsaved.
    pub fn initialize(config: AppConfig) -> AppResult<Self> {
        let database = match open_database(&config) {
            Ok(db) => Some(db),
            Err(e) => {
                tracing::warn!("[AppState] database unavailable, traces will not be stored: {}", e);
                None
            }
        };

        let traces = TraceService::from_config(&config, database.clone())?;
        Ok(Self::new(config, database, traces))
    }

    pub fn is_database_healthy(&self) -> bool {
        self.database.as_ref().is_some_and(Database::is_healthy)
    }
}

fn open_database(config: &AppConfig) -> AppResult<Database> {
    let path = match &config.database_path {
        Some(path) => path.clone(),
        None => database_path()?,
    };
    Database::new(&path)
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("bind_addr", &self.config.bind_addr)
            .field("database", &self.database.is_some())
            .finish()
    }
}
