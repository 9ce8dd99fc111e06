//! Query text and its normalized fingerprint.

use serde::{Deserialize, Serialize};

/// Normalize query text into its fingerprint.
///
/// Case-folds and collapses every run of whitespace into a single space,
/// trimming both ends. Two texts with the same fingerprint are the same
/// information need as far as caching and dedup are concerned.
pub fn fingerprint(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A raw user information need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Query {
    pub text: String,
    pub fingerprint: String,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let fingerprint = fingerprint(&text);
        Self { text, fingerprint }
    }

    /// True when the query has no searchable content.
    pub fn is_empty(&self) -> bool {
        self.fingerprint.is_empty()
    }
}

/// One reformulation of a [`Query`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QueryVariant {
    pub text: String,
    pub fingerprint: String,
    /// Set only on the variant that carries the original query text.
    pub is_original: bool,
}

impl QueryVariant {
    /// The variant that stands for the query itself.
    pub fn original(query: &Query) -> Self {
        Self { text: query.text.trim().to_string(), fingerprint: query.fingerprint.clone(), is_original: true }
    }

    /// Build a paraphrase variant, or `None` for empty/whitespace-only text.
    pub fn paraphrase(text: &str) -> Option<Self> {
        let fingerprint = fingerprint(text);
        if fingerprint.is_empty() {
            return None;
        }
        Some(Self { text: text.trim().to_string(), fingerprint, is_original: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_case_and_whitespace() {
        assert_eq!(fingerprint("  Quantum   Computing\tBASICS \n"), "quantum computing basics");
        assert_eq!(fingerprint("quantum computing basics"), fingerprint("QUANTUM computing  basics"));
    }

    #[test]
    fn test_fingerprint_empty() {
        assert_eq!(fingerprint(""), "");
        assert_eq!(fingerprint(" \t\n "), "");
    }

    #[test]
    fn test_query_new() {
        let q = Query::new("  Rust  Async ");
        assert_eq!(q.text, "  Rust  Async ");
        assert_eq!(q.fingerprint, "rust async");
        assert!(!q.is_empty());
        assert!(Query::new("   ").is_empty());
    }

    #[test]
    fn test_variant_original() {
        let q = Query::new(" What is Rust? ");
        let v = QueryVariant::original(&q);
        assert!(v.is_original);
        assert_eq!(v.text, "What is Rust?");
        assert_eq!(v.fingerprint, "what is rust?");
    }

    #[test]
    fn test_variant_paraphrase_rejects_blank() {
        assert!(QueryVariant::paraphrase("  ").is_none());
        let v = QueryVariant::paraphrase(" rust ownership model ").unwrap();
        assert!(!v.is_original);
        assert_eq!(v.text, "rust ownership model");
    }
}
