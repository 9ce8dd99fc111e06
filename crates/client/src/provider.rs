//! Search provider abstraction.
//!
//! Every provider takes a query string and returns ranked
//! `(title, snippet, url)` hits; the retrieval engine treats them
//! interchangeably and only cares about the priority order it was given.

use sleuth_core::SearchResult;

/// Errors from a single provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Provider is not usable (missing key, bad configuration).
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Provider did not answer within its timeout.
    #[error("provider timeout")]
    Timeout,

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Provider throttled the request.
    #[error("rate limited")]
    RateLimited,

    /// Non-success HTTP status.
    #[error("HTTP error: {status}")]
    Http { status: u16 },

    /// Response body could not be understood.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { ProviderError::Timeout } else { ProviderError::Network(err.to_string()) }
    }
}

/// A lightweight web search backend.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Stable identifier recorded as `SearchResult::source`.
    fn name(&self) -> &str;

    /// Run one query and return at most `limit` hits in provider order.
    ///
    /// Implementations number results from 1 in the order the provider
    /// returned them.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ProviderError>;
}

/// Map a non-success status to a provider error.
pub(crate) fn status_error(status: reqwest::StatusCode) -> ProviderError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimited
    } else {
        ProviderError::Http { status: status.as_u16() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error() {
        assert!(matches!(status_error(reqwest::StatusCode::TOO_MANY_REQUESTS), ProviderError::RateLimited));
        assert!(matches!(
            status_error(reqwest::StatusCode::BAD_GATEWAY),
            ProviderError::Http { status: 502 }
        ));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ProviderError::Timeout.to_string(), "provider timeout");
        assert!(ProviderError::Parse("bad json".into()).to_string().contains("bad json"));
    }
}
