//! Brave API client error types.

use crate::provider::ProviderError;
use std::sync::Arc;

/// Errors from Brave Search API client.
#[derive(Debug, thiserror::Error)]
pub enum BraveError {
    /// No API key configured.
    #[error("missing API key: SLEUTH_BRAVE_API_KEY not set")]
    MissingApiKey,

    /// Invalid search query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Invalid count parameter (must be 1-20).
    #[error("invalid count: must be 1-20")]
    InvalidCount,

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// Rate limited by Brave API.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for BraveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { BraveError::Timeout } else { BraveError::Network(Arc::new(err)) }
    }
}

impl From<BraveError> for ProviderError {
    fn from(err: BraveError) -> Self {
        match err {
            BraveError::MissingApiKey | BraveError::AuthError => ProviderError::Unavailable(err.to_string()),
            BraveError::InvalidQuery(msg) => ProviderError::Unavailable(format!("invalid query: {msg}")),
            BraveError::InvalidCount => ProviderError::Unavailable(err.to_string()),
            BraveError::RateLimited => ProviderError::RateLimited,
            BraveError::HttpError { status } => ProviderError::Http { status },
            BraveError::Timeout => ProviderError::Timeout,
            BraveError::Network(e) => ProviderError::Network(e.to_string()),
            BraveError::Parse(msg) => ProviderError::Parse(msg),
        }
    }
}
