//! Data model passed between the orchestration stages.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A lightweight search hit from one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// Provider identifier (e.g. "brave", "duckduckgo").
    pub source: String,
    /// 1-based position within the provider's result list.
    pub rank: usize,
}

/// Fully fetched and extracted page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PageContent {
    pub url: String,
    pub title: Option<String>,
    /// Extracted text, already truncated to the configured cap.
    pub text: String,
    pub screenshot: Option<PathBuf>,
    /// RFC 3339 timestamp.
    pub fetched_at: String,
}

/// Why automation was (or was not) triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AutomationSignal {
    /// Caller set the explicit force flag.
    Forced,
    /// Query text matched a trigger term.
    Keyword { term: String },
    /// Total snippet text fell below the coverage minimum.
    LowCoverage { snippet_chars: usize, threshold: usize },
    /// Verdict of the optional model classifier.
    ModelAdvisory { verdict: bool },
}

/// Outcome of the automation decider. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AutomationDecision {
    pub value: bool,
    pub reason: String,
    pub signals: Vec<AutomationSignal>,
}

impl AutomationDecision {
    pub fn yes(reason: impl Into<String>, signals: Vec<AutomationSignal>) -> Self {
        Self { value: true, reason: reason.into(), signals }
    }

    pub fn no(reason: impl Into<String>, signals: Vec<AutomationSignal>) -> Self {
        Self { value: false, reason: reason.into(), signals }
    }

    pub fn has_signal(&self, pred: impl Fn(&AutomationSignal) -> bool) -> bool {
        self.signals.iter().any(pred)
    }
}

/// How the final answer text was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// Written by the text-generation collaborator.
    Generated,
    /// Generation failed twice; text is assembled from the top snippets.
    SnippetFallback,
    /// Nothing usable was gathered.
    Insufficient,
}

/// Per-variant record of what the orchestration consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct VariantReport {
    pub text: String,
    pub fingerprint: String,
    pub cache_hit: bool,
}

/// The unit returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AnswerBundle {
    pub text: String,
    /// Urls present in the synthesis context, in context order.
    pub sources: Vec<String>,
    pub variants: Vec<VariantReport>,
    pub outcome: AnswerOutcome,
    pub budget_exhausted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation: Option<AutomationDecision>,
}

impl AnswerBundle {
    pub fn is_insufficient(&self) -> bool {
        self.outcome == AnswerOutcome::Insufficient
    }

    pub fn all_cache_hits(&self) -> bool {
        !self.variants.is_empty() && self.variants.iter().all(|v| v.cache_hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_serialization_is_tagged() {
        let signal = AutomationSignal::Keyword { term: "show me".into() };
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["kind"], "keyword");
        assert_eq!(json["term"], "show me");

        let json = serde_json::to_value(AutomationSignal::Forced).unwrap();
        assert_eq!(json["kind"], "forced");
    }

    #[test]
    fn test_decision_helpers() {
        let d = AutomationDecision::yes("forced", vec![AutomationSignal::Forced]);
        assert!(d.value);
        assert!(d.has_signal(|s| matches!(s, AutomationSignal::Forced)));
        assert!(!d.has_signal(|s| matches!(s, AutomationSignal::Keyword { .. })));
    }

    #[test]
    fn test_bundle_cache_hit_summary() {
        let mut bundle = AnswerBundle {
            text: String::new(),
            sources: vec![],
            variants: vec![],
            outcome: AnswerOutcome::Insufficient,
            budget_exhausted: false,
            automation: None,
        };
        assert!(!bundle.all_cache_hits());
        assert!(bundle.is_insufficient());

        bundle.variants.push(VariantReport { text: "a".into(), fingerprint: "a".into(), cache_hit: true });
        assert!(bundle.all_cache_hits());
        bundle.variants.push(VariantReport { text: "b".into(), fingerprint: "b".into(), cache_hit: false });
        assert!(!bundle.all_cache_hits());
    }
}
