//! Text generation over an OpenAI-compatible chat completions API.
//!
//! The planner, the automation advisory, and the answer synthesizer all go
//! through [`TextGenerator`], so tests can swap in a scripted generator.

use reqwest::header;
use serde::{Deserialize, Serialize};
use sleuth_core::AppConfig;
use std::time::Duration;

/// Errors from a text generation call.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("missing API key: SLEUTH_LLM_API_KEY not set")]
    MissingApiKey,

    #[error("rate limited: too many requests")]
    RateLimited,

    #[error("generation timeout")]
    Timeout,

    #[error("HTTP error: {status}")]
    Http { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    /// The model answered with no content.
    #[error("empty completion")]
    Empty,
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { GenerationError::Timeout } else { GenerationError::Network(err.to_string()) }
    }
}

/// Sampling knobs for a single call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationOptions {
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self { max_tokens, temperature }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self { max_tokens: 500, temperature: 0.7 }
    }
}

/// A model that turns a prompt into text.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String, GenerationError>;
}

/// Chat client configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: String,
    /// API root; `/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ChatConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, GenerationError> {
        let api_key = config.require_llm_api_key().map_err(|_| GenerationError::MissingApiKey)?;
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: config.llm_base_url.trim_end_matches('/').to_string(),
            model: config.llm_model.clone(),
            timeout: config.generation_timeout(),
            user_agent: config.user_agent.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client (OpenRouter by default).
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, GenerationError> {
        if config.api_key.is_empty() {
            return Err(GenerationError::MissingApiKey);
        }
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }
}

#[async_trait::async_trait]
impl TextGenerator for ChatClient {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        tracing::debug!(model = %self.config.model, max_tokens = options.max_tokens, "requesting completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .header(header::USER_AGENT, &self.config.user_agent)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::RateLimited);
        }
        if !status.is_success() {
            return Err(GenerationError::Http { status: status.as_u16() });
        }

        let bytes = response.bytes().await?;
        parse_completion(&bytes)
    }
}

fn parse_completion(body: &[u8]) -> Result<String, GenerationError> {
    let parsed: ChatResponse = serde_json::from_slice(body).map_err(|e| GenerationError::Parse(e.to_string()))?;
    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() { Err(GenerationError::Empty) } else { Ok(text) }
}
