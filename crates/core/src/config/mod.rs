//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SLEUTH_*)
//! 2. TOML config file (if SLEUTH_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Trigger vocabulary for browser automation.
///
/// Phrases that point at visual or interactive content a snippet cannot carry.
pub const DEFAULT_TRIGGER_TERMS: &[&str] = &[
    "screenshot",
    "image",
    "visual",
    "show me",
    "what does it look like",
    "interface",
    "design",
    "layout",
    "appearance",
    "navigate",
    "click",
    "interactive",
    "demo",
    "tutorial",
    "step by step",
    "how to use",
    "login",
    "sign up",
    "dashboard",
    "real-time",
    "live data",
    "scrape",
    "extract data",
    "table",
    "download",
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SLEUTH_*)
/// 2. TOML config file (if SLEUTH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via SLEUTH_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Time-to-live for cache entries in seconds (default: 24h).
    ///
    /// Set via SLEUTH_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Wall-clock budget for one `answer` call in milliseconds.
    #[serde(default = "default_budget_ms")]
    pub budget_ms: u64,

    /// Timeout for a single search provider call in milliseconds.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Timeout for a single page render in milliseconds.
    #[serde(default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,

    /// Timeout for a single text-generation call in milliseconds.
    #[serde(default = "default_generation_timeout_ms")]
    pub generation_timeout_ms: u64,

    /// Delay after navigation to let dynamic content settle, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Maximum number of query variants, including the original.
    #[serde(default = "default_max_variants")]
    pub max_variants: usize,

    /// Maximum results kept from one provider call.
    #[serde(default = "default_results_per_provider")]
    pub results_per_provider: usize,

    /// Maximum variants retrieved concurrently.
    #[serde(default = "default_retrieval_concurrency")]
    pub retrieval_concurrency: usize,

    /// Maximum pages rendered concurrently.
    #[serde(default = "default_page_concurrency")]
    pub page_concurrency: usize,

    /// Number of top-ranked urls handed to browser automation.
    #[serde(default = "default_automation_top_k")]
    pub automation_top_k: usize,

    /// Cap on extracted page text in characters.
    #[serde(default = "default_page_text_max_chars")]
    pub page_text_max_chars: usize,

    /// Extracted page text shorter than this counts as a failed extraction.
    #[serde(default = "default_page_text_min_chars")]
    pub page_text_min_chars: usize,

    /// Snippet coverage below this many characters triggers automation.
    #[serde(default = "default_coverage_min_chars")]
    pub coverage_min_chars: usize,

    /// Trigger vocabulary for automation (case-insensitive).
    ///
    /// Set via SLEUTH_TRIGGER_TERMS environment variable (`[term, term]` array syntax).
    #[serde(default = "default_trigger_terms")]
    pub trigger_terms: Vec<String>,

    /// Consult the text generator as a tertiary automation signal.
    #[serde(default)]
    pub model_advisory: bool,

    /// Cap on a single merged context item in characters.
    #[serde(default = "default_merge_item_max_chars")]
    pub merge_item_max_chars: usize,

    /// Total character budget of the merged context.
    #[serde(default = "default_context_max_chars")]
    pub context_max_chars: usize,

    /// Token budget for the generated answer.
    #[serde(default = "default_answer_max_tokens")]
    pub answer_max_tokens: u32,

    /// Whether browser automation (headless Chromium) is enabled.
    ///
    /// Set via SLEUTH_RENDER_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub render_enabled: bool,

    /// Directory for automation screenshots. Screenshots are skipped when unset.
    #[serde(default)]
    pub screenshot_dir: Option<PathBuf>,

    /// Brave API subscription token.
    ///
    /// Set via SLEUTH_BRAVE_API_KEY environment variable.
    /// The Brave provider is skipped when unset.
    #[serde(default)]
    pub brave_api_key: Option<String>,

    /// Base URL of a SearXNG instance. The SearXNG provider is skipped when unset.
    #[serde(default)]
    pub searxng_url: Option<String>,

    /// API key for the OpenAI-compatible text-generation endpoint.
    ///
    /// Set via SLEUTH_LLM_API_KEY environment variable.
    #[serde(default)]
    pub llm_api_key: Option<String>,

    /// Base URL for the OpenAI-compatible text-generation endpoint.
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,

    /// Model identifier sent to the text-generation endpoint.
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    /// Whether prior conversation turns are stored and consulted.
    #[serde(default = "default_true")]
    pub memory_enabled: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sleuth-cache.sqlite")
}

fn default_user_agent() -> String {
    "sleuth/0.1".into()
}

fn default_cache_ttl_secs() -> u64 {
    86_400
}

fn default_budget_ms() -> u64 {
    60_000
}

fn default_provider_timeout_ms() -> u64 {
    10_000
}

fn default_page_timeout_ms() -> u64 {
    30_000
}

fn default_generation_timeout_ms() -> u64 {
    30_000
}

fn default_settle_ms() -> u64 {
    2_000
}

fn default_max_variants() -> usize {
    4
}

fn default_results_per_provider() -> usize {
    10
}

fn default_retrieval_concurrency() -> usize {
    4
}

fn default_page_concurrency() -> usize {
    2
}

fn default_automation_top_k() -> usize {
    3
}

fn default_page_text_max_chars() -> usize {
    5_000
}

fn default_page_text_min_chars() -> usize {
    150
}

fn default_coverage_min_chars() -> usize {
    500
}

fn default_trigger_terms() -> Vec<String> {
    DEFAULT_TRIGGER_TERMS.iter().map(|t| t.to_string()).collect()
}

fn default_merge_item_max_chars() -> usize {
    2_000
}

fn default_context_max_chars() -> usize {
    8_000
}

fn default_answer_max_tokens() -> u32 {
    600
}

fn default_llm_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}

fn default_llm_model() -> String {
    "mistralai/mistral-7b-instruct".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            cache_ttl_secs: default_cache_ttl_secs(),
            budget_ms: default_budget_ms(),
            provider_timeout_ms: default_provider_timeout_ms(),
            page_timeout_ms: default_page_timeout_ms(),
            generation_timeout_ms: default_generation_timeout_ms(),
            settle_ms: default_settle_ms(),
            max_variants: default_max_variants(),
            results_per_provider: default_results_per_provider(),
            retrieval_concurrency: default_retrieval_concurrency(),
            page_concurrency: default_page_concurrency(),
            automation_top_k: default_automation_top_k(),
            page_text_max_chars: default_page_text_max_chars(),
            page_text_min_chars: default_page_text_min_chars(),
            coverage_min_chars: default_coverage_min_chars(),
            trigger_terms: default_trigger_terms(),
            model_advisory: false,
            merge_item_max_chars: default_merge_item_max_chars(),
            context_max_chars: default_context_max_chars(),
            answer_max_tokens: default_answer_max_tokens(),
            render_enabled: true,
            screenshot_dir: None,
            brave_api_key: None,
            searxng_url: None,
            llm_api_key: None,
            llm_base_url: default_llm_base_url(),
            llm_model: default_llm_model(),
            memory_enabled: true,
        }
    }
}

impl AppConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SLEUTH_`
    /// 2. TOML file from `SLEUTH_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SLEUTH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SLEUTH_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check if the Brave API key is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the Brave API key is not set.
    pub fn require_brave_api_key(&self) -> Result<&str, ConfigError> {
        self.brave_api_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "brave_api_key".into(),
            hint: "Set SLEUTH_BRAVE_API_KEY environment variable".into(),
        })
    }

    /// Check if the text-generation API key is available.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key is not set.
    pub fn require_llm_api_key(&self) -> Result<&str, ConfigError> {
        self.llm_api_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "llm_api_key".into(),
            hint: "Set SLEUTH_LLM_API_KEY environment variable".into(),
        })
    }
}
