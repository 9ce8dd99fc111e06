//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_ttl_secs` is 0
    /// - `budget_ms` is under 1s or exceeds 10 minutes
    /// - a per-call timeout is under 100ms or not shorter than the budget
    /// - `max_variants` is outside 1..=8
    /// - any count, cap, or concurrency limit is 0
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs == 0 {
            return Err(invalid("cache_ttl_secs", "must be greater than 0"));
        }

        if self.budget_ms < 1_000 {
            return Err(invalid("budget_ms", "must be at least 1000ms"));
        }
        if self.budget_ms > 600_000 {
            return Err(invalid("budget_ms", "must not exceed 10 minutes (600000ms)"));
        }

        for (field, value) in [
            ("provider_timeout_ms", self.provider_timeout_ms),
            ("page_timeout_ms", self.page_timeout_ms),
            ("generation_timeout_ms", self.generation_timeout_ms),
        ] {
            if value < 100 {
                return Err(invalid(field, "must be at least 100ms"));
            }
            if value >= self.budget_ms {
                return Err(invalid(field, "must be shorter than budget_ms"));
            }
        }

        if self.settle_ms >= self.page_timeout_ms {
            return Err(invalid("settle_ms", "must be shorter than page_timeout_ms"));
        }

        if !(1..=8).contains(&self.max_variants) {
            return Err(invalid("max_variants", "must be between 1 and 8"));
        }

        for (field, value) in [
            ("results_per_provider", self.results_per_provider),
            ("retrieval_concurrency", self.retrieval_concurrency),
            ("page_concurrency", self.page_concurrency),
            ("automation_top_k", self.automation_top_k),
            ("page_text_max_chars", self.page_text_max_chars),
            ("merge_item_max_chars", self.merge_item_max_chars),
            ("context_max_chars", self.context_max_chars),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }

        if self.results_per_provider > 20 {
            return Err(invalid("results_per_provider", "must not exceed 20"));
        }

        if self.page_text_min_chars > self.page_text_max_chars {
            return Err(invalid("page_text_min_chars", "must not exceed page_text_max_chars"));
        }

        if self.answer_max_tokens == 0 {
            return Err(invalid("answer_max_tokens", "must be greater than 0"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.trigger_terms.iter().any(|t| t.trim().is_empty()) {
            return Err(invalid("trigger_terms", "must not contain empty terms"));
        }

        if self.model_advisory && self.llm_api_key.is_none() {
            tracing::warn!("model_advisory is enabled but llm_api_key is not set; advisory signal will be skipped");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_ttl() {
        let config = AppConfig { cache_ttl_secs: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_ttl_secs"));
    }

    #[test]
    fn test_validate_budget_too_small() {
        let config = AppConfig { budget_ms: 500, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "budget_ms"));
    }

    #[test]
    fn test_validate_subtask_timeout_not_shorter_than_budget() {
        let config = AppConfig { budget_ms: 5_000, provider_timeout_ms: 5_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "provider_timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { generation_timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "generation_timeout_ms"));
    }

    #[test]
    fn test_validate_max_variants_range() {
        let config = AppConfig { max_variants: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "max_variants"));

        let config = AppConfig { max_variants: 9, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "max_variants"));
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let config = AppConfig { page_concurrency: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "page_concurrency"));
    }

    #[test]
    fn test_validate_min_exceeds_max_page_text() {
        let config = AppConfig { page_text_min_chars: 6_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "page_text_min_chars"));
    }

    #[test]
    fn test_validate_empty_trigger_term() {
        let config = AppConfig { trigger_terms: vec!["demo".into(), "  ".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "trigger_terms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            budget_ms: 1_000,
            provider_timeout_ms: 100,
            page_timeout_ms: 999,
            generation_timeout_ms: 999,
            settle_ms: 0,
            max_variants: 1,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
