//! HTTP Client Factory
//!
//! Builds the reqwest clients shared by the providers, with a bounded
//! request timeout.

use std::time::Duration;

use crate::types::{LlmError, LlmResult};

const USER_AGENT: &str = concat!("symptom-trace/", env!("CARGO_PKG_VERSION"));

/// Build a `reqwest::Client` whose requests fail after `timeout`.
pub fn build_http_client(timeout: Duration) -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| LlmError::Other {
            message: format!("Failed to build HTTP client: {}", e),
        })
}

/// Map a transport error, keeping timeouts distinguishable.
pub fn map_transport_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout {
            message: err.to_string(),
        }
    } else {
        LlmError::NetworkError {
            message: err.to_string(),
        }
    }
}
