//! Decides whether the expensive browser pass is worth running.

use sleuth_client::{GenerationOptions, TextGenerator};
use sleuth_core::{AppConfig, AutomationDecision, AutomationSignal, Query, SearchResult};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DeciderConfig {
    /// Lowercase trigger phrases matched against the query fingerprint.
    pub trigger_terms: Vec<String>,
    /// Snippet characters below which coverage counts as thin.
    pub coverage_min_chars: usize,
    /// Ask the model when the rules say no.
    pub model_advisory: bool,
    pub advisory_timeout: Duration,
}

impl From<&AppConfig> for DeciderConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            trigger_terms: config.trigger_terms.iter().map(|t| t.trim().to_lowercase()).collect(),
            coverage_min_chars: config.coverage_min_chars,
            model_advisory: config.model_advisory,
            advisory_timeout: config.generation_timeout(),
        }
    }
}

/// Rule-based decision with an optional model tie-breaker.
#[derive(Clone)]
pub struct AutomationDecider {
    advisor: Option<Arc<dyn TextGenerator>>,
    config: DeciderConfig,
}

impl AutomationDecider {
    pub fn new(advisor: Option<Arc<dyn TextGenerator>>, config: DeciderConfig) -> Self {
        Self { advisor, config }
    }

    /// Rules first; the advisory is only consulted when they say no and
    /// can only turn the answer into yes.
    pub async fn decide(&self, query: &Query, results: &[SearchResult], force: bool) -> AutomationDecision {
        let decision = evaluate_rules(&self.config, query, results, force);
        if decision.value || !self.config.model_advisory {
            return decision;
        }
        let Some(advisor) = &self.advisor else {
            return decision;
        };

        let snippet_chars = snippet_chars(results);
        let prompt = format!(
            "Analyze if browser automation is needed for this query: \"{}\"\n\n\
             Current search results quality: {} results with {} chars of content.\n\n\
             Reply with ONLY \"YES\" if browser automation is needed (for interactive content, visual data, tables, real-time info).\n\
             Reply with ONLY \"NO\" if simple search results are sufficient (for informational queries, definitions, explanations).\n\n\
             Your answer:",
            query.text.trim(),
            results.len(),
            snippet_chars
        );

        let reply =
            tokio::time::timeout(self.config.advisory_timeout, advisor.generate(&prompt, GenerationOptions::new(10, 0.3)))
                .await;

        let verdict = match reply {
            Ok(Ok(text)) => text.to_uppercase().contains("YES"),
            Ok(Err(e)) => {
                tracing::warn!(query = %query.fingerprint, error = %e, "automation advisory failed");
                return decision;
            }
            Err(_) => {
                tracing::warn!(query = %query.fingerprint, "automation advisory timed out");
                return decision;
            }
        };

        let mut signals = decision.signals;
        signals.push(AutomationSignal::ModelAdvisory { verdict });
        if verdict {
            AutomationDecision::yes("model advisory recommends automation", signals)
        } else {
            AutomationDecision::no(decision.reason, signals)
        }
    }
}

/// Total snippet characters across `results`.
pub fn snippet_chars(results: &[SearchResult]) -> usize {
    results.iter().map(|r| r.snippet.chars().count()).sum()
}

/// Keyword and coverage rules. Pure and independent of result order.
pub fn evaluate_rules(
    config: &DeciderConfig, query: &Query, results: &[SearchResult], force: bool,
) -> AutomationDecision {
    let mut signals = Vec::new();

    if force {
        signals.push(AutomationSignal::Forced);
    }

    signals.extend(
        config
            .trigger_terms
            .iter()
            .filter(|term| !term.is_empty() && query.fingerprint.contains(term.as_str()))
            .map(|term| AutomationSignal::Keyword { term: term.clone() }),
    );

    let chars = snippet_chars(results);
    if chars < config.coverage_min_chars {
        signals.push(AutomationSignal::LowCoverage { snippet_chars: chars, threshold: config.coverage_min_chars });
    }

    let reason = match signals.first() {
        None => return AutomationDecision::no("search results are sufficient", signals),
        Some(AutomationSignal::Forced) => "automation forced by caller".to_string(),
        Some(AutomationSignal::Keyword { term }) => format!("query mentions \"{term}\""),
        Some(AutomationSignal::LowCoverage { snippet_chars, threshold }) => {
            format!("snippet coverage {snippet_chars} below {threshold} chars")
        }
        Some(AutomationSignal::ModelAdvisory { .. }) => "model advisory".to_string(),
    };

    AutomationDecision::yes(reason, signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleuth_client::GenerationError;

    fn config() -> DeciderConfig {
        DeciderConfig::from(&AppConfig::default())
    }

    fn hit(snippet_len: usize, rank: usize) -> SearchResult {
        SearchResult {
            url: format!("https://example.com/{rank}"),
            title: "t".into(),
            snippet: "x".repeat(snippet_len),
            source: "fake".into(),
            rank,
        }
    }

    struct Advisor(Result<&'static str, ()>);

    #[async_trait::async_trait]
    impl TextGenerator for Advisor {
        async fn generate(&self, _prompt: &str, _options: GenerationOptions) -> Result<String, GenerationError> {
            self.0.map(str::to_string).map_err(|_| GenerationError::Timeout)
        }
    }

    #[test]
    fn test_keyword_triggers_despite_coverage() {
        let rich = vec![hit(400, 1), hit(400, 2)];
        let d = evaluate_rules(&config(), &Query::new("Show me the interface"), &rich, false);
        assert!(d.value);
        assert!(d.has_signal(|s| matches!(s, AutomationSignal::Keyword { term } if term == "show me")));
        assert!(d.has_signal(|s| matches!(s, AutomationSignal::Keyword { term } if term == "interface")));
        assert!(!d.has_signal(|s| matches!(s, AutomationSignal::LowCoverage { .. })));
    }

    #[test]
    fn test_low_coverage_triggers() {
        let thin = vec![hit(100, 1), hit(100, 2)];
        let d = evaluate_rules(&config(), &Query::new("rust ownership"), &thin, false);
        assert!(d.value);
        assert_eq!(d.signals, vec![AutomationSignal::LowCoverage { snippet_chars: 200, threshold: 500 }]);
    }

    #[test]
    fn test_no_results_is_low_coverage() {
        let d = evaluate_rules(&config(), &Query::new("rust ownership"), &[], false);
        assert!(d.value);
    }

    #[test]
    fn test_sufficient_results_no() {
        let rich = vec![hit(300, 1), hit(300, 2)];
        let d = evaluate_rules(&config(), &Query::new("rust ownership"), &rich, false);
        assert!(!d.value);
        assert!(d.signals.is_empty());
    }

    #[test]
    fn test_force_wins() {
        let rich = vec![hit(600, 1)];
        let d = evaluate_rules(&config(), &Query::new("rust ownership"), &rich, true);
        assert!(d.value);
        assert_eq!(d.signals, vec![AutomationSignal::Forced]);
    }

    #[test]
    fn test_rules_order_independent() {
        let a = vec![hit(100, 1), hit(450, 2)];
        let b = vec![hit(450, 2), hit(100, 1)];
        let q = Query::new("rust");
        assert_eq!(evaluate_rules(&config(), &q, &a, false), evaluate_rules(&config(), &q, &b, false));
    }

    #[tokio::test]
    async fn test_advisory_disabled_by_default() {
        let decider = AutomationDecider::new(Some(Arc::new(Advisor(Ok("YES")))), config());
        let d = decider.decide(&Query::new("rust"), &[hit(600, 1)], false).await;
        assert!(!d.value);
        assert!(d.signals.is_empty());
    }

    #[tokio::test]
    async fn test_advisory_can_flip_to_yes() {
        let cfg = DeciderConfig { model_advisory: true, ..config() };
        let decider = AutomationDecider::new(Some(Arc::new(Advisor(Ok("yes.")))), cfg);
        let d = decider.decide(&Query::new("rust"), &[hit(600, 1)], false).await;
        assert!(d.value);
        assert_eq!(d.signals, vec![AutomationSignal::ModelAdvisory { verdict: true }]);
    }

    #[tokio::test]
    async fn test_advisory_no_and_failure() {
        let cfg = DeciderConfig { model_advisory: true, ..config() };

        let decider = AutomationDecider::new(Some(Arc::new(Advisor(Ok("NO")))), cfg.clone());
        let d = decider.decide(&Query::new("rust"), &[hit(600, 1)], false).await;
        assert!(!d.value);
        assert_eq!(d.signals, vec![AutomationSignal::ModelAdvisory { verdict: false }]);

        let decider = AutomationDecider::new(Some(Arc::new(Advisor(Err(())))), cfg);
        let d = decider.decide(&Query::new("rust"), &[hit(600, 1)], false).await;
        assert!(!d.value);
        assert!(d.signals.is_empty());
    }
}
