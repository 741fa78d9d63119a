//! Services
//!
//! The trace pipelines and the sinks a finished trace is written to.

pub mod persistence;
pub mod pipeline;
