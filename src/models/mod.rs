//! Data Models
//!
//! Configuration, HTTP bodies, and stored trace records.

pub mod response;
pub mod settings;
pub mod trace;

pub use response::*;
pub use settings::*;
pub use trace::*;
