//! Brave Search API request types and validation.

use serde::{Deserialize, Serialize};

/// Search request parameters for Brave Web Search API.
///
/// Based on Brave Web Search API documentation:
/// https://api-dashboard.search.brave.com/app/documentation/web-search/get-started
#[derive(Debug, Clone, Serialize, Default)]
pub struct SearchRequest {
    /// Search query (required, max 400 chars / 50 words).
    pub q: String,

    /// Number of results (1-20, default 20).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u8>,

    /// Safe search: off|moderate|strict (default moderate).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safesearch: Option<SafeSearch>,

    /// Country code (ISO 3166-1 alpha-2, e.g., "US").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// Content language (ISO 639-1, e.g., "en").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_lang: Option<String>,

    /// Enable up to 5 extra snippets per result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_snippets: Option<bool>,
}

/// Safe search filtering levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    Off,
    Moderate,
    Strict,
}

impl SearchRequest {
    /// Request for `query` capped at `limit` results (clamped to 1-20).
    pub fn for_query(query: &str, limit: usize) -> Self {
        Self {
            q: query.trim().to_string(),
            count: Some(limit.clamp(1, 20) as u8),
            extra_snippets: Some(true),
            ..Default::default()
        }
    }

    /// Validate the search request parameters.
    ///
    /// Returns an error if any parameters are out of range or malformed.
    pub fn validate(&self) -> Result<(), crate::brave::BraveError> {
        use crate::brave::BraveError;

        if self.q.is_empty() {
            return Err(BraveError::InvalidQuery("query cannot be empty".to_string()));
        }

        if self.q.len() > 400 {
            return Err(BraveError::InvalidQuery(format!(
                "query too long: {} chars (max 400)",
                self.q.len()
            )));
        }

        let word_count = self.q.split_whitespace().count();
        if word_count > 50 {
            return Err(BraveError::InvalidQuery(format!(
                "query too long: {} words (max 50)",
                word_count
            )));
        }

        if let Some(count) = self.count
            && !(1..=20).contains(&count)
        {
            return Err(BraveError::InvalidCount);
        }

        Ok(())
    }

    /// Get the effective count (default 20).
    pub fn get_count(&self) -> u8 {
        self.count.unwrap_or(20)
    }

    /// Get the effective safesearch setting (default Moderate).
    pub fn get_safesearch(&self) -> SafeSearch {
        self.safesearch.unwrap_or(SafeSearch::Moderate)
    }
}
