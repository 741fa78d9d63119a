//! Storage Layer
//!
//! Handles data persistence: the SQLite trace database and JSON config.

pub mod config;
pub mod database;

pub use config::*;
pub use database::*;
