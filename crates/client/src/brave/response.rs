//! Brave Search API response types and normalization.

use serde::Deserialize;
use sleuth_core::SearchResult;

/// Raw response from Brave Web Search API.
#[derive(Debug, Deserialize)]
pub struct BraveApiResponse {
    pub query: QueryInfo,
    #[serde(default)]
    pub web: Option<WebResults>,
}

/// Query metadata from Brave response.
#[derive(Debug, Deserialize)]
pub struct QueryInfo {
    pub original: String,
    #[serde(default)]
    #[serde(alias = "moreResultsAvailable")]
    pub more_results_available: bool,
}

/// Web search results container.
#[derive(Debug, Deserialize)]
pub struct WebResults {
    pub results: Vec<WebResult>,
}

/// Individual web search result from Brave.
#[derive(Debug, Deserialize)]
pub struct WebResult {
    pub title: String,
    #[serde(alias = "url")]
    pub source_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub extra_snippets: Vec<String>,
}

impl BraveApiResponse {
    /// Normalize into ranked results, keeping at most `limit`.
    ///
    /// Extra snippets are appended to the description so coverage counts
    /// everything the provider gave us.
    pub fn into_results(self, limit: usize) -> Vec<SearchResult> {
        self.web
            .map(|w| {
                w.results
                    .into_iter()
                    .filter(|r| !r.source_url.is_empty())
                    .take(limit)
                    .enumerate()
                    .map(|(idx, r)| {
                        let mut snippet = strip_tags(&r.description);
                        for extra in &r.extra_snippets {
                            snippet.push(' ');
                            snippet.push_str(&strip_tags(extra));
                        }
                        SearchResult {
                            url: r.source_url,
                            title: strip_tags(&r.title),
                            snippet: snippet.trim().to_string(),
                            source: "brave".to_string(),
                            rank: idx + 1,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Brave highlights matches with `<strong>`; drop inline markup.
fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_JSON: &str = r#"{
        "query": {
            "original": "test query",
            "moreResultsAvailable": true
        },
        "web": {
            "results": [
                {
                    "title": "Example <strong>Domain</strong>",
                    "url": "https://example.com",
                    "description": "This domain is for use in illustrative examples",
                    "extra_snippets": ["First snippet", "Second snippet"]
                },
                {
                    "title": "Test Page",
                    "url": "https://test.com",
                    "description": "A test page",
                    "extra_snippets": []
                }
            ]
        }
    }"#;

    #[test]
    fn test_deserialize_brave_response() {
        let response: BraveApiResponse = serde_json::from_str(FIXTURE_JSON).unwrap();
        assert_eq!(response.query.original, "test query");
        assert!(response.query.more_results_available);
        assert_eq!(response.web.unwrap().results.len(), 2);
    }

    #[test]
    fn test_normalize_to_results() {
        let raw: BraveApiResponse = serde_json::from_str(FIXTURE_JSON).unwrap();
        let results = raw.into_results(10);

        assert_eq!(results.len(), 2);

        let first = &results[0];
        assert_eq!(first.rank, 1);
        assert_eq!(first.title, "Example Domain");
        assert_eq!(first.url, "https://example.com");
        assert_eq!(first.source, "brave");
        assert!(first.snippet.ends_with("First snippet Second snippet"));

        assert_eq!(results[1].rank, 2);
        assert_eq!(results[1].snippet, "A test page");
    }

    #[test]
    fn test_limit_applies_before_ranking() {
        let raw: BraveApiResponse = serde_json::from_str(FIXTURE_JSON).unwrap();
        let results = raw.into_results(1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rank, 1);
    }

    #[test]
    fn test_empty_results() {
        let json = r#"{"query": {"original": "test"}, "web": {"results": []}}"#;
        let raw: BraveApiResponse = serde_json::from_str(json).unwrap();
        assert!(raw.into_results(10).is_empty());

        let json = r#"{"query": {"original": "test"}}"#;
        let raw: BraveApiResponse = serde_json::from_str(json).unwrap();
        assert!(raw.into_results(10).is_empty());
    }
}
