//! Ironic client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Ironic API
#[derive(Debug, Error)]
pub enum IronicError {
    /// HTTP request/response error (connection refused, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ironic returned an unexpected error status, typically a 5xx
    #[error("Ironic API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflicting state (HTTP 409), e.g. the node is locked or being
    /// registered concurrently
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IronicError {
    /// True for errors where retrying the same call later may succeed.
    ///
    /// Rejections of the request itself (400, 401/403, 404) are terminal.
    pub fn is_transient(&self) -> bool {
        match self {
            IronicError::Conflict(_) | IronicError::Api(_) => true,
            IronicError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
