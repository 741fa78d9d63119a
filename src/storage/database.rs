//! SQLite Database
//!
//! Trace store backed by rusqlite with r2d2 connection pooling.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use symptom_trace_core::TraceResult;

use crate::models::trace::{StoredTrace, TraceSummary};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::ensure_parent_dir;

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Node rows are positioned `chain_index * CHAIN_STRIDE + node_index`
const CHAIN_STRIDE: usize = 100;

/// Database service for managing SQLite operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create an in-memory database for testing.
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| {
                AppError::persistence(format!("Failed to create connection pool: {}", e))
            })?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Open (or create) the database file with connection pooling
    pub fn new(path: &Path) -> AppResult<Self> {
        ensure_parent_dir(path)?;

        let manager = SqliteConnectionManager::file(path)
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| {
                AppError::persistence(format!("Failed to create connection pool: {}", e))
            })?;

        let db = Self { pool };
        db.init_schema()?;

        tracing::info!("[Database] opened {}", path.display());
        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> AppResult<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS traces (
                id TEXT PRIMARY KEY,
                input_text TEXT NOT NULL,
                thinking TEXT NOT NULL DEFAULT '',
                chains TEXT NOT NULL,
                summary TEXT NOT NULL,
                suggestions TEXT NOT NULL,
                document TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS trace_chain_nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trace_id TEXT NOT NULL REFERENCES traces(id) ON DELETE CASCADE,
                chain_id TEXT NOT NULL,
                node_type TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                confidence REAL NOT NULL,
                position INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS trace_suggestions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                trace_id TEXT NOT NULL REFERENCES traces(id) ON DELETE CASCADE,
                text TEXT NOT NULL,
                for_doctor INTEGER NOT NULL,
                urgency TEXT NOT NULL,
                position INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_traces_created_at ON traces(created_at)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_trace_chain_nodes_trace ON trace_chain_nodes(trace_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_trace_suggestions_trace ON trace_suggestions(trace_id)",
            [],
        )?;

        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| AppError::persistence(format!("Failed to get connection: {}", e)))
    }

    /// Check if the database is healthy
    pub fn is_healthy(&self) -> bool {
        if let Ok(conn) = self.pool.get() {
            conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
        } else {
            false
        }
    }

    /// Write a trace, its chain nodes, and its suggestions in one transaction.
    pub fn insert_trace(&self, id: &str, trace: &TraceResult, document: &str) -> AppResult<()> {
        let conn = self.get_connection()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO traces (id, input_text, thinking, chains, summary, suggestions, document, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                trace.symptoms.raw_input,
                trace.thinking,
                serde_json::to_string(&trace.chains)?,
                trace.summary,
                serde_json::to_string(&trace.suggestions)?,
                document,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;

        for (ci, chain) in trace.chains.iter().enumerate() {
            for (ni, node) in chain.nodes.iter().enumerate() {
                tx.execute(
                    "INSERT INTO trace_chain_nodes
                        (trace_id, chain_id, node_type, title, description, confidence, position)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        id,
                        chain.id,
                        node.node_type.to_string(),
                        node.title,
                        node.description,
                        node.confidence,
                        (ci * CHAIN_STRIDE + ni) as i64,
                    ],
                )?;
            }
        }

        for (i, suggestion) in trace.suggestions.iter().enumerate() {
            tx.execute(
                "INSERT INTO trace_suggestions (trace_id, text, for_doctor, urgency, position)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    suggestion.text,
                    suggestion.for_doctor,
                    suggestion.urgency.to_string(),
                    i as i64,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Most recent traces, newest first
    pub fn list_traces(&self, limit: u32) -> AppResult<Vec<TraceSummary>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, input_text, summary, created_at FROM traces
             ORDER BY created_at DESC, rowid DESC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(TraceSummary {
                    id: row.get(0)?,
                    input_text: row.get(1)?,
                    summary: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }

    /// Get a single trace by ID
    pub fn get_trace(&self, id: &str) -> AppResult<Option<StoredTrace>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT id, input_text, thinking, chains, summary, suggestions, document, created_at
             FROM traces WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            },
        );

        let (id, input_text, thinking, chains, summary, suggestions, document, created_at) =
            match result {
                Ok(row) => row,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                Err(e) => return Err(e.into()),
            };

        Ok(Some(StoredTrace {
            id,
            input_text,
            thinking,
            chains: serde_json::from_str(&chains)?,
            summary,
            suggestions: serde_json::from_str(&suggestions)?,
            document,
            created_at,
        }))
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("pool_size", &self.pool.state().connections)
            .finish()
    }
}
